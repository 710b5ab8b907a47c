use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::error::ExtractError;
use crate::model::{PageTokens, Token};

/// Reads a decoder dump: a JSON array when the file ends in `.json`, CSV with
/// a `page,text,x,y` header otherwise.
pub fn read_token_dump(path: &Path) -> Result<Vec<Token>, ExtractError> {
    let is_json = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let file = File::open(path)?;
    if is_json {
        read_tokens_json(BufReader::new(file))
    } else {
        read_tokens_csv(file)
    }
}

pub fn read_tokens_csv<R: Read>(reader: R) -> Result<Vec<Token>, ExtractError> {
    let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
    let mut tokens = Vec::new();
    for record in reader.deserialize() {
        tokens.push(record?);
    }
    Ok(tokens)
}

pub fn read_tokens_json<R: Read>(reader: R) -> Result<Vec<Token>, ExtractError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Groups tokens by page number, in ascending page order. Order within a page
/// is kept but never relied upon.
pub fn group_tokens_by_page(tokens: Vec<Token>) -> Result<Vec<PageTokens>, ExtractError> {
    if tokens.is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    let mut pages: BTreeMap<u32, Vec<Token>> = BTreeMap::new();
    for token in tokens {
        pages.entry(token.page).or_default().push(token);
    }

    Ok(pages
        .into_iter()
        .map(|(page_number, tokens)| PageTokens {
            page_number,
            tokens,
        })
        .collect())
}
