//! Loading a VM arrival stream from CSV. Rows are `id,start_time,end_time,demands`,
//! with `demands` a semicolon-joined list of per-slot values (each VM's trace
//! length varies, so it can't be one column per slot).

use std::path::Path;

use crate::machine::VirtualMachine;

/// Read a VM stream from `path`. Fatal on a malformed row or a demand outside
/// `(0, 1]` — the caller's `anyhow::Result` surfaces these as load failures.
pub fn load_vms(path: impl AsRef<Path>) -> anyhow::Result<Vec<VirtualMachine>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path.as_ref())?;

    let mut vms = Vec::new();
    for result in reader.records() {
        let record = result?;
        anyhow::ensure!(
            record.len() == 4,
            "malformed VM row, expected 4 fields, got {}",
            record.len()
        );
        let id: u64 = record[0].parse()?;
        let start_time: u64 = record[1].parse()?;
        let end_time: u64 = record[2].parse()?;
        let demands: Vec<f64> = record[3]
            .split(';')
            .map(str::parse)
            .collect::<Result<_, _>>()?;
        vms.push(VirtualMachine::new(id, start_time, end_time, demands)?);
    }
    Ok(vms)
}

/// Write one summary row per simulated slot: `slot,active_pms`.
pub fn write_slot_summary(path: impl AsRef<Path>, rows: &[(u64, usize)]) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path.as_ref())?;
    writer.write_record(["slot", "active_pms"])?;
    for (slot, active) in rows {
        writer.write_record([slot.to_string(), active.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_vms_parses_semicolon_demands() {
        let mut file = tempfile_with_content(
            "id,start_time,end_time,demands\n1,0,2,0.5;0.6;0.7\n2,1,1,0.9\n",
        );
        let vms = load_vms(file.path()).unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].id, 1);
        assert_eq!(vms[0].length(), 3);
        assert_eq!(vms[1].start_time, 1);
        let _ = file.flush();
    }

    #[test]
    fn load_vms_rejects_demand_out_of_range() {
        let file = tempfile_with_content("id,start_time,end_time,demands\n1,0,0,1.5\n");
        assert!(load_vms(file.path()).is_err());
    }

    fn tempfile_with_content(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
