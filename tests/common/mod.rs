use std::path::Path;

use draw_layout::{PageTokens, Token};

pub const ROW_PITCH: f32 = 12.0;

/// Builds one page of positioned tokens the way a text-layer decoder would
/// emit them for a printed draw table.
pub struct PageBuilder {
    page: u32,
    tokens: Vec<Token>,
}

pub struct DrawLine<'a> {
    pub date: Option<&'a str>,
    pub session: Option<&'a str>,
    pub values: &'a [&'a str],
    pub special: Option<&'a str>,
}

impl PageBuilder {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            tokens: Vec::new(),
        }
    }

    pub fn token(mut self, text: &str, x: f32, y: f32) -> Self {
        self.tokens.push(Token::new(self.page, text, x, y));
        self
    }

    /// Lays a row out from `x0`: date, session 30 units right, values every
    /// 20 units from `x0 + 50`, then an `FB` tag and its digit. An empty value
    /// leaves its slot blank.
    pub fn line(mut self, x0: f32, y: f32, line: &DrawLine<'_>) -> Self {
        self.push_markers(x0, y, line);
        let x = self.push_values(x0 + 50.0, y, line.values);
        if let Some(special) = line.special {
            self.tokens.push(Token::new(self.page, "FB", x - 10.0, y + 1.0));
            self.tokens.push(Token::new(self.page, special, x, y + 1.0));
        }
        self
    }

    /// Same row with the tag printed first: `FB` at `x0 + 50`, its digit
    /// 10 units right, then the values every 20 units from `x0 + 80`.
    pub fn leading_tag_line(mut self, x0: f32, y: f32, line: &DrawLine<'_>) -> Self {
        self.push_markers(x0, y, line);
        if let Some(special) = line.special {
            self.tokens.push(Token::new(self.page, "FB", x0 + 50.0, y + 1.0));
            self.tokens.push(Token::new(self.page, special, x0 + 60.0, y + 1.0));
        }
        self.push_values(x0 + 80.0, y, line.values);
        self
    }

    fn push_markers(&mut self, x0: f32, y: f32, line: &DrawLine<'_>) {
        if let Some(date) = line.date {
            self.tokens.push(Token::new(self.page, date, x0, y));
        }
        if let Some(session) = line.session {
            self.tokens.push(Token::new(self.page, session, x0 + 30.0, y));
        }
    }

    fn push_values(&mut self, mut x: f32, y: f32, values: &[&str]) -> f32 {
        for value in values {
            if !value.is_empty() {
                self.tokens.push(Token::new(self.page, *value, x, y));
            }
            x += 20.0;
        }
        x
    }

    pub fn build(self) -> PageTokens {
        PageTokens {
            page_number: self.page,
            tokens: self.tokens,
        }
    }
}

pub fn write_token_csv(path: &Path, pages: &[PageTokens]) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    for page in pages {
        for token in &page.tokens {
            writer.serialize(token)?;
        }
    }
    writer.flush()?;
    Ok(())
}
