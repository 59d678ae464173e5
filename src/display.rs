use std::io::Write;

use anyhow::Result;
use tabwriter::TabWriter;

use crate::core::{Credential, Transaction};

pub fn print_links<T: std::io::Write>(wr: T, credentials: &[Credential]) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(tw, "Institution\tAccess Token")?;

    for credential in credentials {
        writeln!(
            tw,
            "{}\t{}",
            credential.institution_id,
            credential.masked_token()
        )?;
    }

    tw.flush()?;

    Ok(())
}

pub fn print_transactions<T: std::io::Write>(wr: T, txns: &[Transaction]) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(tw, "Date\tName\tAmount\tCategory\tInstitution\tTransaction ID")?;

    for tx in txns {
        writeln!(
            tw,
            "{}\t{}\t{:.2}\t{}\t{}\t{}",
            tx.date,
            tx.name,
            tx.amount,
            tx.flat_category().unwrap_or_default(),
            tx.institution_id,
            tx.transaction_id,
        )?;
    }

    tw.flush()?;

    Ok(())
}
