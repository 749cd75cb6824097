use crate::ast::Accidental;
use crate::error::{LexErrorKind, SongError};

/// Direction of an octave marker run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveDirection {
    Up,   // '
    Down, // . or ,
}

/// Kind of a duration marker run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationKind {
    Dash,      // - (one more beat)
    Underline, // _ (halves)
    Dot,       // * (augmentation dot)
    Triplet,   // /3 (two thirds)
}

/// Token types for melody and lyric lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // Melody
    Pitch {
        degree: u8,
        accidental: Option<Accidental>,
    },
    OctaveMarker {
        direction: OctaveDirection,
        count: u32,
    },
    DurationMarker {
        kind: DurationKind,
        count: u32,
    },
    BarLine,
    TieMarker,

    // Lyrics
    Syllable {
        text: String,
        hyphenated: bool,
    },
    Melisma, // ~
}

/// A token with its 0-based column in the source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedToken {
    pub token: Token,
    pub position: usize,
}

/// Lexer for one melody line
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// `line` is the 1-based source line, used only for error reporting.
    pub fn new(input: &'a str, line: usize) -> Self {
        Self {
            chars: input.chars().peekable(),
            line,
            column: 0,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.column += 1;
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Consume further copies of `c` and return the total run length.
    fn run_of(&mut self, c: char) -> u32 {
        let mut count = 1;
        while self.peek() == Some(&c) {
            self.advance();
            count += 1;
        }
        count
    }

    fn error(&self, position: usize, kind: LexErrorKind) -> SongError {
        SongError::Lex {
            line: self.line,
            position,
            kind,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<LocatedToken>, SongError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.advance() {
            let position = self.column - 1;

            let token = match c {
                ' ' | '\t' | '\r' => continue,
                '0'..='7' => Token::Pitch {
                    degree: c as u8 - b'0',
                    accidental: None,
                },
                '#' | 'b' | '%' => {
                    let accidental = match c {
                        '#' => Accidental::Sharp,
                        'b' => Accidental::Flat,
                        _ => Accidental::Natural,
                    };
                    match self.peek() {
                        Some(&d @ '1'..='7') => {
                            self.advance();
                            Token::Pitch {
                                degree: d as u8 - b'0',
                                accidental: Some(accidental),
                            }
                        }
                        _ => return Err(self.error(position, LexErrorKind::UnterminatedMarker)),
                    }
                }
                '\'' => Token::OctaveMarker {
                    direction: OctaveDirection::Up,
                    count: self.run_of(c),
                },
                '.' | ',' => Token::OctaveMarker {
                    direction: OctaveDirection::Down,
                    count: self.run_of(c),
                },
                '-' => Token::DurationMarker {
                    kind: DurationKind::Dash,
                    count: self.run_of(c),
                },
                '_' => Token::DurationMarker {
                    kind: DurationKind::Underline,
                    count: self.run_of(c),
                },
                // Shorthand for a double underline
                '=' => Token::DurationMarker {
                    kind: DurationKind::Underline,
                    count: 2 * self.run_of(c),
                },
                '/' => match self.peek() {
                    Some(&'3') => {
                        self.advance();
                        Token::DurationMarker {
                            kind: DurationKind::Triplet,
                            count: 1,
                        }
                    }
                    _ => return Err(self.error(position, LexErrorKind::UnterminatedMarker)),
                },
                '*' => Token::DurationMarker {
                    kind: DurationKind::Dot,
                    count: self.run_of(c),
                },
                '|' => Token::BarLine,
                '~' => Token::TieMarker,
                _ => return Err(self.error(position, LexErrorKind::UnrecognizedCharacter(c))),
            };

            tokens.push(LocatedToken { token, position });
        }

        log::trace!("line {}: {} melody tokens", self.line, tokens.len());
        Ok(tokens)
    }
}

/// Whether a lyric line declares an instrumental line (`-` alone).
pub fn is_instrumental(lyrics: &str) -> bool {
    lyrics.trim() == "-"
}

/// Split a lyric line into syllable tokens.
///
/// Words are whitespace separated. Inside a word, `-` separates syllables of
/// the same word; a word of CJK ideographs gives one syllable per character;
/// a lone `~` holds the previous syllable over another note. Lyric text never
/// fails to lex.
pub fn tokenize_lyrics(input: &str) -> Vec<LocatedToken> {
    let mut tokens = Vec::new();
    // (column, byte offset) where the current word began
    let mut word_start: Option<(usize, usize)> = None;

    for (column, (byte, c)) in input.char_indices().enumerate() {
        if c.is_whitespace() {
            if let Some((start_col, start_byte)) = word_start.take() {
                push_word(&mut tokens, &input[start_byte..byte], start_col);
            }
        } else if word_start.is_none() {
            word_start = Some((column, byte));
        }
    }
    if let Some((start_col, start_byte)) = word_start {
        push_word(&mut tokens, &input[start_byte..], start_col);
    }

    tokens
}

fn push_word(tokens: &mut Vec<LocatedToken>, word: &str, position: usize) {
    if word == "~" {
        tokens.push(LocatedToken {
            token: Token::Melisma,
            position,
        });
        return;
    }

    // Every ideograph starts a syllable; punctuation stays with the one before
    if word.chars().any(is_cjk) {
        for (offset, c) in word.chars().enumerate() {
            let in_word = matches!(tokens.last(), Some(t) if t.position >= position);
            if !is_cjk(c) && in_word {
                if let Some(LocatedToken {
                    token: Token::Syllable { text, .. },
                    ..
                }) = tokens.last_mut()
                {
                    text.push(c);
                }
                continue;
            }
            tokens.push(LocatedToken {
                token: Token::Syllable {
                    text: c.to_string(),
                    hyphenated: false,
                },
                position: position + offset,
            });
        }
        return;
    }

    let parts: Vec<&str> = word.split('-').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        // A word made only of hyphens is kept verbatim
        tokens.push(LocatedToken {
            token: Token::Syllable {
                text: word.to_string(),
                hyphenated: false,
            },
            position,
        });
        return;
    }

    let mut offset = 0;
    for (i, part) in parts.iter().enumerate() {
        let local = word[offset..].find(part).map_or(0, |p| p + offset);
        offset = local + part.len();
        tokens.push(LocatedToken {
            token: Token::Syllable {
                text: part.to_string(),
                hyphenated: i + 1 < parts.len(),
            },
            position: position + word[..local].chars().count(),
        });
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}')
}
