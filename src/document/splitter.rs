use crate::document::Passage;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Character splitter that prefers paragraph, then line, then word boundaries.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            overlap: 200,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let pieces = self.atomize(text, 0, "");
        self.merge(pieces)
    }

    /// Splits a passage, keeping its source locator on every chunk.
    pub fn split_passage(&self, passage: &Passage) -> Vec<Passage> {
        self.split_text(&passage.text)
            .into_iter()
            .map(|text| Passage::new(text, passage.source.clone(), passage.page))
            .collect()
    }

    // Breaks text into pieces no longer than chunk_size. Each piece carries the
    // separator that joined it to the previous one.
    fn atomize(
        &self,
        text: &str,
        level: usize,
        joined_by: &'static str,
    ) -> Vec<(String, &'static str)> {
        if char_len(text) <= self.chunk_size {
            return vec![(text.to_string(), joined_by)];
        }

        let Some(&sep) = SEPARATORS.get(level) else {
            let chars: Vec<char> = text.chars().collect();
            return chars
                .chunks(self.chunk_size)
                .enumerate()
                .map(|(i, c)| (c.iter().collect(), if i == 0 { joined_by } else { "" }))
                .collect();
        };

        let mut pieces = Vec::new();
        for part in text.split(sep).map(str::trim).filter(|p| !p.is_empty()) {
            let first_joiner = if pieces.is_empty() { joined_by } else { sep };
            pieces.extend(self.atomize(part, level + 1, first_joiner));
        }
        pieces
    }

    fn merge(&self, pieces: Vec<(String, &'static str)>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<(String, &'static str)> = Vec::new();

        for (piece, sep) in pieces {
            let piece_len = char_len(&piece);
            let fits = |window: &[(String, &'static str)]| {
                window.is_empty()
                    || window_len(window) + char_len(sep) + piece_len <= self.chunk_size
            };

            if !fits(&window) {
                chunks.push(join(&window));
                // Carry a tail of the previous chunk forward as overlap
                while !window.is_empty() && (window_len(&window) > self.overlap || !fits(&window)) {
                    window.remove(0);
                }
            }
            window.push((piece, sep));
        }

        if !window.is_empty() {
            chunks.push(join(&window));
        }
        chunks
    }
}

fn window_len(window: &[(String, &'static str)]) -> usize {
    window
        .iter()
        .enumerate()
        .map(|(i, (piece, sep))| char_len(piece) + if i == 0 { 0 } else { char_len(sep) })
        .sum()
}

fn join(window: &[(String, &'static str)]) -> String {
    let mut out = String::new();
    for (i, (piece, sep)) in window.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(piece);
    }
    out
}
