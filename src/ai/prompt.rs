use serde_json::Value;

use crate::ai::context::{ContextBundle, Counterpart, HistoryEntry};
use crate::models::{ExtractedContent, Role};
use crate::prompts::Prompts;

/// Prior turns actually sent to the model, counted from the newest.
pub const PROMPT_HISTORY_CAP: usize = 10;
/// Free-text extraction previews are cut to this many characters.
pub const RAW_TEXT_PREVIEW_CHARS: usize = 500;

pub const NO_EXTRACTED_TEXT_MARKER: &str = "(No extracted text available yet)";

/// Structured-extraction fields rendered into the prompt, in display order.
/// Anything outside this list (and the medicines array) is ignored.
const LABELED_FIELDS: &[(&str, &str)] = &[
    ("document_type", "Document Type"),
    ("diagnosis", "Diagnosis"),
    ("doctor_name", "Doctor"),
    ("patient_name", "Patient"),
    ("date", "Date"),
    ("hospital", "Hospital"),
    ("instructions", "Instructions"),
    ("test_results", "Test Results"),
    ("vital_signs", "Vital Signs"),
    ("additional_notes", "Additional Notes"),
];

/// Everything the responder needs: one system instruction and a bounded,
/// chronological history.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub system_instruction: String,
    pub history: Vec<HistoryEntry>,
}

/// Renders the context bundle and history into the model's input shape.
/// Pure: same inputs, same prompt. Missing optional fields are omitted
/// rather than rendered as placeholders.
pub fn build_prompt(bundle: &ContextBundle, history: &[HistoryEntry], role: Role) -> BuiltPrompt {
    let persona = match role {
        Role::Patient => Prompts::PATIENT_PERSONA,
        Role::Doctor => Prompts::DOCTOR_PERSONA,
    };

    let mut out = String::new();
    out.push_str(persona);
    out.push_str("\n\n");

    out.push_str(&format!(
        "Medical Records ({} appointments):\n",
        bundle.appointments.len()
    ));

    for (i, appointment) in bundle.appointments.iter().enumerate() {
        out.push_str(&format!("\nAppointment {}:\n", i + 1));
        out.push_str(&format!(
            "Date: {}\n",
            appointment.date.format("%B %-d, %Y")
        ));

        match &appointment.counterpart {
            Counterpart::Doctor {
                name,
                specialty,
                hospital,
            } => {
                out.push_str(&format!("Doctor: {}\n", name));
                if let Some(specialty) = specialty {
                    out.push_str(&format!("Specialty: {}\n", specialty));
                }
                if let Some(hospital) = hospital {
                    out.push_str(&format!("Hospital: {}\n", hospital));
                }
            }
            Counterpart::Patient { name, age, gender } => {
                out.push_str(&format!("Patient: {}\n", name));
                if let Some(age) = age {
                    out.push_str(&format!("Age: {}\n", age));
                }
                if let Some(gender) = gender {
                    out.push_str(&format!("Gender: {}\n", gender));
                }
            }
        }

        if let Some(notes) = &appointment.notes {
            if !notes.trim().is_empty() {
                out.push_str(&format!("Notes: {}\n", notes));
            }
        }

        for document in &appointment.documents {
            out.push_str(&format!(
                "- {} (uploaded {})\n",
                document.file_name,
                document.uploaded_at.format("%B %-d, %Y")
            ));
            render_content(&mut out, &document.content);
        }
    }

    out.push('\n');
    out.push_str(Prompts::GUIDELINES);

    let start = history.len().saturating_sub(PROMPT_HISTORY_CAP);

    BuiltPrompt {
        system_instruction: out,
        history: history[start..].to_vec(),
    }
}

fn render_content(out: &mut String, content: &ExtractedContent) {
    match content {
        ExtractedContent::Structured(fields) => {
            for (key, label) in LABELED_FIELDS {
                if let Some(value) = fields.get(*key).and_then(Value::as_str) {
                    if is_meaningful(value) {
                        out.push_str(&format!("  {}: {}\n", label, value));
                    }
                }
            }
            if let Some(medicines) = fields.get("medicines").and_then(Value::as_array) {
                let named: Vec<&str> = medicines
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|m| is_meaningful(m))
                    .collect();
                if !named.is_empty() {
                    out.push_str("  Medicines:\n");
                    for medicine in named {
                        out.push_str(&format!("  - {}\n", medicine));
                    }
                }
            }
            if let Some(raw) = fields.get("raw_extraction").and_then(Value::as_str) {
                if is_meaningful(raw) {
                    out.push_str(&format!("  Extracted text: {}\n", preview(raw)));
                }
            }
        }
        ExtractedContent::PlainText(text) => {
            out.push_str(&format!("  Extracted text: {}\n", preview(text)));
        }
        ExtractedContent::Empty => {
            out.push_str(&format!("  {}\n", NO_EXTRACTED_TEXT_MARKER));
        }
    }
}

fn is_meaningful(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != "Not specified"
}

fn preview(text: &str) -> String {
    text.chars().take(RAW_TEXT_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::context::{AppointmentContext, DocumentContext, HistoryRole};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn structured(fields: Value) -> ExtractedContent {
        match fields {
            Value::Object(map) => ExtractedContent::Structured(map),
            _ => panic!("test fixture must be a JSON object"),
        }
    }

    fn appointment_with(content: ExtractedContent) -> AppointmentContext {
        AppointmentContext {
            id: Uuid::new_v4(),
            date: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
            notes: Some("Follow-up in two weeks".to_string()),
            counterpart: Counterpart::Doctor {
                name: "Dr. Rivera".to_string(),
                specialty: Some("Cardiology".to_string()),
                hospital: None,
            },
            documents: vec![DocumentContext {
                file_name: "prescription.jpg".to_string(),
                uploaded_at: Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
                content,
            }],
        }
    }

    #[test]
    fn structured_extraction_renders_labeled_fields_and_medicines() {
        let bundle = ContextBundle {
            appointments: vec![appointment_with(structured(json!({
                "document_type": "Prescription",
                "diagnosis": "Flu",
                "medicines": ["Paracetamol 500mg twice daily"],
                "hospital": "Not specified",
            })))],
        };

        let prompt = build_prompt(&bundle, &[], Role::Patient);

        assert!(prompt.system_instruction.contains("Diagnosis: Flu"));
        assert!(prompt
            .system_instruction
            .contains("- Paracetamol 500mg twice daily"));
        assert!(!prompt.system_instruction.contains("Hospital: Not specified"));
    }

    #[test]
    fn empty_extraction_renders_the_placeholder_marker() {
        let bundle = ContextBundle {
            appointments: vec![appointment_with(ExtractedContent::Empty)],
        };

        let prompt = build_prompt(&bundle, &[], Role::Patient);
        assert!(prompt.system_instruction.contains(NO_EXTRACTED_TEXT_MARKER));
    }

    #[test]
    fn plain_text_extraction_is_cut_to_the_preview_length() {
        let long = "x".repeat(2000);
        let bundle = ContextBundle {
            appointments: vec![appointment_with(ExtractedContent::PlainText(long))],
        };

        let prompt = build_prompt(&bundle, &[], Role::Patient);
        let line = prompt
            .system_instruction
            .lines()
            .find(|l| l.contains("Extracted text:"))
            .unwrap();
        assert!(line.len() < 600);
    }

    #[test]
    fn patient_callers_see_doctor_fields_only() {
        let bundle = ContextBundle {
            appointments: vec![appointment_with(ExtractedContent::Empty)],
        };

        let prompt = build_prompt(&bundle, &[], Role::Patient);
        assert!(prompt.system_instruction.contains("Doctor: Dr. Rivera"));
        assert!(prompt.system_instruction.contains("Specialty: Cardiology"));
        assert!(prompt
            .system_instruction
            .starts_with(Prompts::PATIENT_PERSONA));
    }

    #[test]
    fn doctor_callers_see_patient_fields_only() {
        let mut appointment = appointment_with(ExtractedContent::Empty);
        appointment.counterpart = Counterpart::Patient {
            name: "Alex Kim".to_string(),
            age: Some(42),
            gender: None,
        };
        let bundle = ContextBundle {
            appointments: vec![appointment],
        };

        let prompt = build_prompt(&bundle, &[], Role::Doctor);
        assert!(prompt.system_instruction.contains("Patient: Alex Kim"));
        assert!(prompt.system_instruction.contains("Age: 42"));
        assert!(!prompt.system_instruction.contains("Gender:"));
        assert!(prompt
            .system_instruction
            .starts_with(Prompts::DOCTOR_PERSONA));
    }

    #[test]
    fn history_is_capped_to_the_most_recent_turns() {
        let history: Vec<HistoryEntry> = (0..25)
            .map(|i| HistoryEntry {
                role: if i % 2 == 0 {
                    HistoryRole::User
                } else {
                    HistoryRole::Assistant
                },
                content: format!("turn {}", i),
            })
            .collect();

        let bundle = ContextBundle::default();
        let prompt = build_prompt(&bundle, &history, Role::Patient);

        assert_eq!(prompt.history.len(), PROMPT_HISTORY_CAP);
        assert_eq!(prompt.history.first().unwrap().content, "turn 15");
        assert_eq!(prompt.history.last().unwrap().content, "turn 24");
    }
}
