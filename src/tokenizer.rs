/// Splits one physical line into fields.
///
/// Delimiters between a matched pair of enclosure characters do not split the
/// line. An enclosure character that is never closed is kept as ordinary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTokenizer {
    delimiter: char,
    enclosure: Option<char>,
}

impl RecordTokenizer {
    pub fn new(delimiter: char, enclosure: Option<char>) -> Self {
        Self {
            delimiter,
            enclosure,
        }
    }

    pub fn split(&self, line: &str) -> Vec<String> {
        let Some(quote) = self.enclosure else {
            return line.split(self.delimiter).map(str::to_string).collect();
        };

        // An enclosure opens only if another one follows later in the line.
        let last_quote = line.rfind(quote);
        let mut fields = Vec::new();
        let mut start = 0usize;
        let mut enclosed = false;
        for (idx, ch) in line.char_indices() {
            if ch == quote {
                if enclosed {
                    enclosed = false;
                } else if last_quote.is_some_and(|last| last > idx) {
                    enclosed = true;
                }
            } else if ch == self.delimiter && !enclosed {
                fields.push(self.strip_enclosure(&line[start..idx]));
                start = idx + ch.len_utf8();
            }
        }
        fields.push(self.strip_enclosure(&line[start..]));
        fields
    }

    /// Removes a surrounding enclosure pair; anything else is returned as-is.
    pub fn strip_enclosure(&self, raw: &str) -> String {
        let Some(quote) = self.enclosure else {
            return raw.to_string();
        };
        let width = quote.len_utf8();
        if raw.len() >= width * 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            raw[width..raw.len() - width].to_string()
        } else {
            raw.to_string()
        }
    }
}

impl Default for RecordTokenizer {
    fn default() -> Self {
        Self::new(',', None)
    }
}
