//! Best-effort text recovery for HWP 5.x files.
//!
//! HWP documents are OLE compound files whose body sections are usually
//! deflated, but the `PrvText` preview stream and uncompressed bodies hold
//! plain UTF-16LE. Scanning for runs of readable UTF-16LE code units recovers
//! that text without a full HWP parser. Compressed-only files yield little or
//! nothing and end up rejected as empty.

const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const MIN_RUN_CHARS: usize = 10;

pub fn extract_hwp_text(bytes: &[u8]) -> Result<String, String> {
    if !bytes.starts_with(&OLE_SIGNATURE) {
        return Err("not an HWP 5.x compound document".to_string());
    }

    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();

    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        match char::from_u32(u32::from(unit)).filter(|ch| is_readable(*ch)) {
            Some(ch) => current.push(ch),
            None => flush_run(&mut current, &mut runs),
        }
    }
    flush_run(&mut current, &mut runs);

    runs.dedup();
    Ok(runs.join("\n"))
}

fn flush_run(current: &mut String, runs: &mut Vec<String>) {
    let run = current.trim();
    if run.chars().count() >= MIN_RUN_CHARS && run.chars().any(is_hangul) {
        runs.push(run.to_string());
    }
    current.clear();
}

fn is_hangul(ch: char) -> bool {
    matches!(ch, '\u{AC00}'..='\u{D7A3}')
}

fn is_readable(ch: char) -> bool {
    is_hangul(ch)
        || matches!(ch, ' '..='~')
        || matches!(ch, '\u{3131}'..='\u{318E}')
        || matches!(ch, '·' | '「' | '」' | '『' | '』' | '※' | '○' | '□' | '■' | '▶')
}
