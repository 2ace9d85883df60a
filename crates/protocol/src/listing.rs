//! Format of the listing resource.
//!
//! UTF-8, one name per line, each line terminated by `\n`.

/// Encodes resource names as a listing document, in the order given.
pub fn encode_listing<I>(names: I) -> Vec<u8>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut doc = Vec::new();
    for name in names {
        doc.extend_from_slice(name.as_ref().as_bytes());
        doc.push(b'\n');
    }
    doc
}

/// Splits a listing document back into names. Blank lines are skipped.
pub fn parse_listing(doc: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(doc)
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
