use std::io::{Cursor, Write};

use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ReportCard;
use crate::error::AppResult;

/// `boletin_<apellidos>_<nombres>_<identificación>_<periodo>.json`, sin espacios.
/// La identificación es única por colegio, así que no hay nombres repetidos en el ZIP.
pub fn report_card_file_name(card: &ReportCard) -> String {
    let clean = |s: &str| s.split_whitespace().collect::<Vec<_>>().join("_");
    format!(
        "boletin_{}_{}_{}_{}.json",
        clean(&card.student.last_names),
        clean(&card.student.first_names),
        clean(&card.student.identification),
        clean(&card.period.name)
    )
}

/// Empaqueta los boletines como JSON legible dentro de un ZIP en memoria.
pub fn export_zip(cards: &[ReportCard]) -> AppResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for card in cards {
        writer.start_file(report_card_file_name(card), options)?;
        let body = serde_json::to_vec_pretty(card)?;
        writer.write_all(&body)?;
    }
    let cursor = writer.finish()?;
    info!(files = cards.len(), "report cards exported");
    Ok(cursor.into_inner())
}
