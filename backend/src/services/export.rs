//! CSV export of recorded interactions.
//!
//! Every row starts with the capture date followed by the common interaction
//! columns; the trailing columns depend on the export kind.

use chrono_tz::Tz;
use serde_json::Value;

use crate::models::analysis::EMOTION_LABELS;
use crate::models::telemetry::{Interaction, SessionDocument};
use crate::models::view::ExportKind;
use crate::utils::csv::{guard_formula, number_cell};
use crate::utils::text::sanitize_text;
use crate::utils::time::capture_date_label;

const COMMON_COLUMNS: [&str; 11] = [
    "date", "site", "image", "type", "time", "class", "id", "x", "y", "scroll", "height",
];

pub fn header(kind: ExportKind) -> Vec<String> {
    let mut columns: Vec<String> = COMMON_COLUMNS.iter().map(|c| c.to_string()).collect();
    match kind {
        ExportKind::Trace => columns.push("keys".to_string()),
        ExportKind::Voice => columns.push("text".to_string()),
        ExportKind::Face => columns.extend(EMOTION_LABELS.iter().map(|l| l.to_string())),
    }
    columns
}

fn text_cell(raw: &str) -> String {
    guard_formula(&sanitize_text(raw)).into_owned()
}

fn value_cells(kind: ExportKind, interaction: &Interaction) -> Vec<String> {
    match kind {
        ExportKind::Trace => {
            let keys = match &interaction.value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vec![text_cell(&keys)]
        }
        ExportKind::Voice => vec![text_cell(interaction.text().unwrap_or_default())],
        ExportKind::Face => EMOTION_LABELS
            .iter()
            .map(|label| number_cell(interaction.value.get(*label).and_then(Value::as_f64)))
            .collect(),
    }
}

/// Writes the selected interactions of `docs` as CSV. An empty `sites`
/// selects every site.
pub fn export_csv(
    docs: &[SessionDocument],
    sites: &[String],
    kind: ExportKind,
    tz: &Tz,
) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header(kind))?;

    let mut rows = 0usize;
    for doc in docs {
        let date = text_cell(&capture_date_label(&doc.datetime, tz));
        for (record, interaction) in doc.interactions_of(kind.kinds()) {
            if !sites.is_empty() && !sites.contains(&record.site) {
                continue;
            }
            let mut row = vec![
                date.clone(),
                text_cell(&record.site),
                interaction.image.to_string(),
                interaction.kind.as_str().to_string(),
                interaction.time.to_string(),
                text_cell(interaction.class_name.as_deref().unwrap_or_default()),
                text_cell(interaction.element_id.as_deref().unwrap_or_default()),
                number_cell(interaction.x),
                number_cell(interaction.y),
                number_cell(interaction.scroll),
                number_cell(interaction.height),
            ];
            row.extend(value_cells(kind, interaction));
            writer.write_record(&row)?;
            rows += 1;
        }
    }

    let bytes = writer.into_inner().map_err(|err| anyhow::anyhow!("{}", err))?;
    tracing::debug!(kind = kind.as_str(), rows, "Built CSV export");
    Ok(String::from_utf8(bytes)?)
}

pub fn export_filename(kind: ExportKind) -> String {
    format!("{}.csv", kind.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::telemetry::{IngestBatch, InteractionKind};
    use crate::types::{BlobId, SessionId, UserId};
    use serde_json::json;

    fn interaction(kind: InteractionKind, value: Value) -> Interaction {
        Interaction {
            kind,
            time: 1.25,
            x: Some(10.0),
            y: None,
            scroll: Some(0.0),
            height: Some(900.0),
            class_name: Some("=cmd".into()),
            element_id: Some("btn".into()),
            image: BlobId::new(),
            value,
        }
    }

    fn doc(site: &str, interactions: Vec<Interaction>) -> SessionDocument {
        SessionDocument::create(
            SessionId::new(),
            UserId::new(),
            IngestBatch {
                captured_at: "2024-05-02T01:00:00.000Z".into(),
                site: site.into(),
                image: BlobId::new(),
                interactions,
            },
        )
    }

    fn lines(csv: &str) -> Vec<&str> {
        csv.lines().collect()
    }

    #[test]
    fn trace_export_filters_kinds_and_guards_formulas() {
        let docs = vec![doc(
            "a.com",
            vec![
                interaction(InteractionKind::Keyboard, json!("Enter")),
                interaction(InteractionKind::Voice, json!("hello")),
            ],
        )];
        let csv = export_csv(&docs, &[], ExportKind::Trace, &chrono_tz::UTC).unwrap();
        let lines = lines(&csv);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("date,site,image,type,time"));
        assert!(lines[0].ends_with(",keys"));
        assert!(lines[1].starts_with("02/05/2024,a.com,"));
        assert!(lines[1].contains(",keyboard,1.25,'=cmd,btn,10,,0,900,Enter"));
    }

    #[test]
    fn site_filter_and_time_zone_apply() {
        let docs = vec![
            doc("a.com", vec![interaction(InteractionKind::Voice, json!("oi"))]),
            doc("b.com", vec![interaction(InteractionKind::Voice, json!("tchau"))]),
        ];
        let csv = export_csv(
            &docs,
            &["b.com".to_string()],
            ExportKind::Voice,
            &chrono_tz::America::Sao_Paulo,
        )
        .unwrap();
        let lines = lines(&csv);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("01/05/2024,b.com,"));
        assert!(lines[1].ends_with(",tchau"));
    }

    #[test]
    fn unparsable_capture_date_is_guarded_like_free_text() {
        let docs = vec![SessionDocument::create(
            SessionId::new(),
            UserId::new(),
            IngestBatch {
                captured_at: "=HYPERLINK(\"http://evil\")".into(),
                site: "a.com".into(),
                image: BlobId::new(),
                interactions: vec![interaction(InteractionKind::Voice, json!("oi"))],
            },
        )];
        let csv = export_csv(&docs, &[], ExportKind::Voice, &chrono_tz::UTC).unwrap();
        let lines = lines(&csv);
        assert!(lines[1].starts_with("\"'=HYPERLINK(\"\"http://evil\"\")\",a.com,"));
    }

    #[test]
    fn face_export_spreads_emotion_scores() {
        let docs = vec![doc(
            "a.com",
            vec![interaction(
                InteractionKind::Face,
                json!({"happy": 0.75, "sad": 0.25}),
            )],
        )];
        let csv = export_csv(&docs, &[], ExportKind::Face, &chrono_tz::UTC).unwrap();
        let lines = lines(&csv);
        assert_eq!(header(ExportKind::Face).len(), 19);
        assert!(lines[0].ends_with("anger,contempt,disgust,fear,happy,neutral,sad,surprise"));
        assert!(lines[1].ends_with(",,,,,0.75,,0.25,"));
    }

    #[test]
    fn empty_selection_yields_header_only() {
        let csv = export_csv(&[], &[], ExportKind::Voice, &chrono_tz::UTC).unwrap();
        assert_eq!(lines(&csv).len(), 1);
        assert_eq!(export_filename(ExportKind::Voice), "voice.csv");
    }
}
