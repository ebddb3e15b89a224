use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;

/// Number of distinct accounts the generators spread operations over.
pub const ACCOUNTS: usize = 50;

fn account(i: usize) -> String {
    format!("acc{i}")
}

fn write_accounts(wtr: &mut csv::Writer<File>) -> Result<(), Error> {
    for i in 1..=ACCOUNTS {
        wtr.write_record(["create", &account(i), "", "1000.0"])?;
    }
    Ok(())
}

/// Creates the accounts, then `rows` transfers between random pairs.
pub fn generate_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(["type", "account", "to", "amount"])?;
    write_accounts(&mut wtr)?;

    for _ in 0..rows {
        let from = rng.gen_range(1..=ACCOUNTS);
        let to = rng.gen_range(1..=ACCOUNTS);
        let amount = format!("{}.{:02}", rng.gen_range(0..20), rng.gen_range(1..100));
        wtr.write_record(["transfer", &account(from), &account(to), &amount])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn generate_large_csv(path: &Path, size_mb: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(["type", "account", "to", "amount"])?;
    write_accounts(&mut wtr)?;

    let target_size = (size_mb * 1024 * 1024) as u64;

    // Check size every 5000 rows to avoid syscall overhead
    loop {
        for _ in 0..5000 {
            let from = rng.gen_range(1..=ACCOUNTS);
            let to = rng.gen_range(1..=ACCOUNTS);
            wtr.write_record(["transfer", &account(from), &account(to), "1.0"])?;
        }
        wtr.flush()?; // Flush to ensure file size is updated
        if std::fs::metadata(path)?.len() >= target_size {
            break;
        }
    }
    Ok(())
}
