use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, load_session, session::SessionOptions, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let session = load_session(&args.source, SessionOptions::default())?;
    let Some(headers) = session.headers() else {
        return Ok(());
    };
    let rows = session
        .rows()
        .iter()
        .take(args.rows)
        .map(|row| {
            (0..headers.len())
                .map(|idx| crate::cell::cell_text(row, idx))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    table::print_table(&headers.columns, &rows);
    info!(
        "Displayed {} of {} row(s) from {:?}",
        rows.len(),
        headers.row_count,
        args.source.input
    );
    Ok(())
}
