use std::io::Write;

pub const ALIGNMENT: usize = 4;

pub fn padding_len(src_len: usize) -> usize {
    (ALIGNMENT - (src_len % ALIGNMENT)) % ALIGNMENT
}

/// Fails without consuming anything if fewer than `needed` bytes remain.
pub fn ensure_remaining(src: &[u8], needed: usize) -> std::io::Result<()> {
    if src.len() < needed {
        return Err(length_mismatch(needed, src.len()));
    }
    Ok(())
}

/// Splits `len` bytes plus their XDR padding off the front of `src`.
pub fn take_padded<'a>(src: &mut &'a [u8], len: usize) -> std::io::Result<&'a [u8]> {
    let padded = len
        .checked_add(padding_len(len))
        .ok_or_else(|| invalid_data("opaque length overflows usize"))?;
    ensure_remaining(src, padded)?;
    let (head, tail) = src.split_at(padded);
    *src = tail;
    Ok(&head[..len])
}

pub fn write_padding(src_len: usize, dest: &mut impl Write) -> std::io::Result<()> {
    let pad_len = padding_len(src_len);
    if pad_len > 0 {
        let padding_buffer: [u8; ALIGNMENT] = Default::default();
        dest.write_all(&padding_buffer[..pad_len])?;
    }
    Ok(())
}

pub fn invalid_data(m: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, m)
}

pub fn length_mismatch(declared: usize, remaining: usize) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        format!("length mismatch: need {declared} bytes, {remaining} remaining"),
    )
}
