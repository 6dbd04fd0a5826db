use crate::diagnostics::Diagnostic;

/// CSS token kinds per CSS Syntax Level 3.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Function(String),
    AtKeyword(String),
    Hash { value: String, id_valid: bool },
    String(String),
    /// String terminated by an unescaped newline.
    BadString,
    Url(String),
    /// `url(` whose body could not be consumed as a URL.
    BadUrl,
    Number { value: f64, is_integer: bool },
    Percentage(f64),
    Dimension { value: f64, unit: String },
    Whitespace,
    Comment,
    Colon,
    Semicolon,
    Comma,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Delim(char),
    /// `<!--`
    Cdo,
    /// `-->`
    Cdc,
    Eof,
}

/// A token plus the byte span it was read from. Spans of consecutive tokens
/// tile the input exactly (whitespace and comments included), which is what
/// lets diagnostics point back into the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: u32,
    pub len: u32,
}

impl Token {
    /// End of this token's span (byte offset one past the last byte).
    pub fn end(&self) -> u32 {
        self.offset + self.len
    }
}

/// A tokenizer over a borrowed source string.
///
/// Works on bytes: any byte ≥ 0x80 counts as a name character, so non-ASCII
/// text (including lossily decoded input) flows through identifiers per the
/// CSS error-recovery rules. The tokenizer never fails; malformed constructs
/// become `BadString`/`BadUrl` tokens plus a recorded diagnostic.
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    token_start: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Tokenize `input` into a vector of tokens (excluding EOF).
pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).tokenize_all()
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            token_start: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the entire input into a vector of tokens (excluding EOF).
    pub fn tokenize_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            if tok.kind == TokenKind::Eof {
                break;
            }
            tokens.push(tok);
        }
        tokens
    }

    /// Diagnostics recorded so far, draining the internal buffer.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Consume and return the next token with its source span.
    pub fn next_token(&mut self) -> Token {
        self.token_start = self.pos;
        let kind = self.consume_token();
        Token {
            kind,
            offset: self.token_start as u32,
            len: (self.pos - self.token_start) as u32,
        }
    }

    fn consume_token(&mut self) -> TokenKind {
        let Some(b) = self.byte(self.pos) else {
            return TokenKind::Eof;
        };

        // Whitespace
        if is_whitespace(b) {
            self.consume_whitespace();
            return TokenKind::Whitespace;
        }

        // Comment
        if b == b'/' && self.byte(self.pos + 1) == Some(b'*') {
            return self.consume_comment();
        }

        // String tokens
        if b == b'"' || b == b'\'' {
            return self.consume_string(b);
        }

        // Hash
        if b == b'#' {
            self.pos += 1;
            if self.byte(self.pos).is_some_and(is_name_byte) || self.starts_valid_escape_at(self.pos)
            {
                let id_valid = self.would_start_ident_at(self.pos);
                let value = self.consume_name();
                return TokenKind::Hash { value, id_valid };
            }
            return TokenKind::Delim('#');
        }

        // Number / Percentage / Dimension starting with digit, sign, or '.'
        if b == b'+' || b == b'-' {
            if self.starts_number_at(self.pos) {
                return self.consume_numeric();
            }
            // CDC: -->
            if b == b'-' && self.src[self.pos..].starts_with("-->") {
                self.pos += 3;
                return TokenKind::Cdc;
            }
            // Ident starting with '-' (includes custom properties `--x`)
            if self.would_start_ident_at(self.pos) {
                return self.consume_ident_like();
            }
            self.pos += 1;
            return TokenKind::Delim(b as char);
        }

        if b == b'.' {
            if self.starts_number_at(self.pos) {
                return self.consume_numeric();
            }
            self.pos += 1;
            return TokenKind::Delim('.');
        }

        if b.is_ascii_digit() {
            return self.consume_numeric();
        }

        // At-keyword
        if b == b'@' {
            self.pos += 1;
            if self.would_start_ident_at(self.pos) {
                let name = self.consume_name();
                return TokenKind::AtKeyword(name);
            }
            return TokenKind::Delim('@');
        }

        // CDO: <!--
        if b == b'<' && self.src[self.pos..].starts_with("<!--") {
            self.pos += 4;
            return TokenKind::Cdo;
        }

        // Simple single-byte tokens
        match b {
            b':' => {
                self.pos += 1;
                TokenKind::Colon
            }
            b';' => {
                self.pos += 1;
                TokenKind::Semicolon
            }
            b',' => {
                self.pos += 1;
                TokenKind::Comma
            }
            b'[' => {
                self.pos += 1;
                TokenKind::LBracket
            }
            b']' => {
                self.pos += 1;
                TokenKind::RBracket
            }
            b'(' => {
                self.pos += 1;
                TokenKind::LParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RParen
            }
            b'{' => {
                self.pos += 1;
                TokenKind::LBrace
            }
            b'}' => {
                self.pos += 1;
                TokenKind::RBrace
            }
            _ => {
                // Ident-like (includes url() and function tokens)
                if is_name_start_byte(b) || b == b'\\' {
                    return self.consume_ident_like();
                }
                // Non-name byte below 0x80 is always a one-byte delimiter.
                self.pos += 1;
                TokenKind::Delim(b as char)
            }
        }
    }

    // --- Helper methods ---

    fn byte(&self, idx: usize) -> Option<u8> {
        self.src.as_bytes().get(idx).copied()
    }

    fn diag(&mut self, message: &str) {
        self.diagnostics
            .push(Diagnostic::warning(self.token_start as u32, message));
    }

    fn consume_whitespace(&mut self) {
        while self.byte(self.pos).is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn consume_comment(&mut self) -> TokenKind {
        self.pos += 2; // past "/*"
        loop {
            match self.byte(self.pos) {
                None => {
                    self.diag("unterminated comment");
                    return TokenKind::Comment;
                }
                Some(b'*') if self.byte(self.pos + 1) == Some(b'/') => {
                    self.pos += 2;
                    return TokenKind::Comment;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn consume_string(&mut self, quote: u8) -> TokenKind {
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            match self.byte(self.pos) {
                None => {
                    // EOF in string: parse error, but keep what we have.
                    self.diag("unterminated string");
                    return TokenKind::String(value);
                }
                Some(b) if b == quote => {
                    self.pos += 1;
                    return TokenKind::String(value);
                }
                Some(b'\n') => {
                    // Unescaped newline: the newline is *not* part of the
                    // token; it is reconsumed as whitespace.
                    self.diag("newline in string");
                    return TokenKind::BadString;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.byte(self.pos) {
                        None => {
                            self.diag("unterminated string");
                            return TokenKind::String(value);
                        }
                        Some(b'\n') => self.pos += 1, // escaped newline: line continuation
                        Some(_) => value.push(self.consume_escape()),
                    }
                }
                Some(b) if b < 0x80 => {
                    value.push(b as char);
                    self.pos += 1;
                }
                Some(_) => {
                    let ch = self.char_at(self.pos);
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    /// Decode the char starting at `idx`. Callers only ask at char boundaries.
    fn char_at(&self, idx: usize) -> char {
        self.src[idx..].chars().next().unwrap_or('\u{FFFD}')
    }

    /// Consume an escape sequence. The backslash is already consumed.
    fn consume_escape(&mut self) -> char {
        let Some(b) = self.byte(self.pos) else {
            return '\u{FFFD}';
        };
        if b.is_ascii_hexdigit() {
            let start = self.pos;
            while self.pos - start < 6 && self.byte(self.pos).is_some_and(|b| b.is_ascii_hexdigit())
            {
                self.pos += 1;
            }
            let cp = u32::from_str_radix(&self.src[start..self.pos], 16).unwrap_or(0xFFFD);
            // One whitespace after a hex escape is part of the escape.
            match self.byte(self.pos) {
                Some(b'\r') => {
                    self.pos += 1;
                    if self.byte(self.pos) == Some(b'\n') {
                        self.pos += 1;
                    }
                }
                Some(b) if is_whitespace(b) => self.pos += 1,
                _ => {}
            }
            if cp == 0 {
                return '\u{FFFD}';
            }
            char::from_u32(cp).unwrap_or('\u{FFFD}')
        } else {
            let ch = self.char_at(self.pos);
            self.pos += ch.len_utf8();
            ch
        }
    }

    fn starts_valid_escape_at(&self, idx: usize) -> bool {
        self.byte(idx) == Some(b'\\') && self.byte(idx + 1).is_some_and(|b| b != b'\n')
    }

    fn would_start_ident_at(&self, start: usize) -> bool {
        match self.byte(start) {
            Some(b) if is_name_start_byte(b) => true,
            Some(b'-') => match self.byte(start + 1) {
                Some(b) if is_name_start_byte(b) || b == b'-' => true,
                Some(b'\\') => self.starts_valid_escape_at(start + 1),
                _ => false,
            },
            Some(b'\\') => self.starts_valid_escape_at(start),
            _ => false,
        }
    }

    fn starts_number_at(&self, start: usize) -> bool {
        match self.byte(start) {
            Some(b) if b.is_ascii_digit() => true,
            Some(b'+') | Some(b'-') => match self.byte(start + 1) {
                Some(b) if b.is_ascii_digit() => true,
                Some(b'.') => self.byte(start + 2).is_some_and(|b| b.is_ascii_digit()),
                _ => false,
            },
            Some(b'.') => self.byte(start + 1).is_some_and(|b| b.is_ascii_digit()),
            _ => false,
        }
    }

    fn consume_name(&mut self) -> String {
        let mut name = String::new();
        loop {
            match self.byte(self.pos) {
                Some(b) if is_name_byte(b) => {
                    // Runs of name bytes are copied as a slice. A run always
                    // ends at an ASCII byte, so the slice is on a char boundary.
                    let run = self.pos;
                    while self.byte(self.pos).is_some_and(is_name_byte) {
                        self.pos += 1;
                    }
                    name.push_str(&self.src[run..self.pos]);
                }
                Some(b'\\') if self.starts_valid_escape_at(self.pos) => {
                    self.pos += 1;
                    name.push(self.consume_escape());
                }
                _ => return name,
            }
        }
    }

    fn consume_numeric(&mut self) -> TokenKind {
        let (value, is_integer) = self.consume_number();

        // Followed by an ident start → dimension
        if self.would_start_ident_at(self.pos) {
            let unit = self.consume_name();
            return TokenKind::Dimension { value, unit };
        }

        // Followed by '%' → percentage
        if self.byte(self.pos) == Some(b'%') {
            self.pos += 1;
            return TokenKind::Percentage(value);
        }

        TokenKind::Number { value, is_integer }
    }

    fn consume_number(&mut self) -> (f64, bool) {
        let start = self.pos;
        let mut is_integer = true;

        if matches!(self.byte(self.pos), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        while self.byte(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.byte(self.pos) == Some(b'.')
            && self.byte(self.pos + 1).is_some_and(|b| b.is_ascii_digit())
        {
            is_integer = false;
            self.pos += 1;
            while self.byte(self.pos).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.byte(self.pos), Some(b'e') | Some(b'E')) {
            let mut exp_end = self.pos + 1;
            if matches!(self.byte(exp_end), Some(b'+') | Some(b'-')) {
                exp_end += 1;
            }
            if self.byte(exp_end).is_some_and(|b| b.is_ascii_digit()) {
                is_integer = false;
                self.pos = exp_end;
                while self.byte(self.pos).is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let value = self.src[start..self.pos].parse::<f64>().unwrap_or(0.0);
        (value, is_integer)
    }

    fn consume_ident_like(&mut self) -> TokenKind {
        let name = self.consume_name();

        // function token: name immediately followed by '('
        if self.byte(self.pos) == Some(b'(') {
            self.pos += 1;

            if name.eq_ignore_ascii_case("url") {
                return self.consume_url();
            }
            return TokenKind::Function(name);
        }

        TokenKind::Ident(name)
    }

    fn consume_url(&mut self) -> TokenKind {
        self.consume_whitespace();

        // Quoted body: url("…") is a function token; the string follows.
        if matches!(self.byte(self.pos), Some(b'"') | Some(b'\'')) {
            return TokenKind::Function("url".to_string());
        }

        let mut url = String::new();
        loop {
            match self.byte(self.pos) {
                None => {
                    self.diag("unterminated url()");
                    return TokenKind::Url(url);
                }
                Some(b')') => {
                    self.pos += 1;
                    return TokenKind::Url(url);
                }
                Some(b) if is_whitespace(b) => {
                    self.consume_whitespace();
                    match self.byte(self.pos) {
                        None => {
                            self.diag("unterminated url()");
                            return TokenKind::Url(url);
                        }
                        Some(b')') => {
                            self.pos += 1;
                            return TokenKind::Url(url);
                        }
                        // Whitespace inside an unquoted URL body.
                        _ => return self.consume_bad_url_remnants(),
                    }
                }
                Some(b'"') | Some(b'\'') | Some(b'(') => return self.consume_bad_url_remnants(),
                Some(b'\\') => {
                    if self.starts_valid_escape_at(self.pos) {
                        self.pos += 1;
                        url.push(self.consume_escape());
                    } else {
                        return self.consume_bad_url_remnants();
                    }
                }
                Some(b) if b < 0x80 => {
                    url.push(b as char);
                    self.pos += 1;
                }
                Some(_) => {
                    let ch = self.char_at(self.pos);
                    url.push(ch);
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    /// Consume through the closing `)` of a malformed url(), honouring
    /// escapes so an escaped paren does not end the token early.
    fn consume_bad_url_remnants(&mut self) -> TokenKind {
        self.diag("invalid url()");
        loop {
            match self.byte(self.pos) {
                None => return TokenKind::BadUrl,
                Some(b')') => {
                    self.pos += 1;
                    return TokenKind::BadUrl;
                }
                Some(b'\\') if self.starts_valid_escape_at(self.pos) => {
                    self.pos += 1;
                    self.consume_escape();
                }
                Some(b) if b < 0x80 => self.pos += 1,
                Some(_) => self.pos += self.char_at(self.pos).len_utf8(),
            }
        }
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0C)
}

fn is_name_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_name_byte(b: u8) -> bool {
    is_name_start_byte(b) || b.is_ascii_digit() || b == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        let toks = kinds("body { color: red; }");
        assert_eq!(toks[0], TokenKind::Ident("body".into()));
        assert_eq!(toks[1], TokenKind::Whitespace);
        assert_eq!(toks[2], TokenKind::LBrace);
        assert_eq!(toks[4], TokenKind::Ident("color".into()));
        assert_eq!(toks[5], TokenKind::Colon);
        assert_eq!(toks[7], TokenKind::Ident("red".into()));
        assert_eq!(toks[8], TokenKind::Semicolon);
        assert_eq!(toks[10], TokenKind::RBrace);
    }

    #[test]
    fn test_spans_tile_the_input() {
        for src in [
            "body { color: red; }",
            "a /* note */ b",
            "p::before { content: \"x\"; }",
            "@media (min-width: 10px) { .x { width: calc(1px + 2%); } }",
            "div > p + span ~ i || td",
            "url(  spaced bad  ) \"unterminated",
            "h1 { }  /* unterminated",
            "naïve café π",
        ] {
            let toks = tokenize(src);
            let total: u32 = toks.iter().map(|t| t.len).sum();
            assert_eq!(total as usize, src.len(), "spans must tile {src:?}");
            let mut expected = 0;
            for t in &toks {
                assert_eq!(t.offset, expected, "token offsets must be contiguous");
                expected = t.end();
            }
        }
    }

    #[test]
    fn test_numbers_and_dimensions() {
        let toks = kinds("10px 2.5em 50% 100 -3px");
        assert_eq!(
            toks[0],
            TokenKind::Dimension {
                value: 10.0,
                unit: "px".into()
            }
        );
        assert_eq!(
            toks[2],
            TokenKind::Dimension {
                value: 2.5,
                unit: "em".into()
            }
        );
        assert_eq!(toks[4], TokenKind::Percentage(50.0));
        assert_eq!(
            toks[6],
            TokenKind::Number {
                value: 100.0,
                is_integer: true
            }
        );
        assert_eq!(
            toks[8],
            TokenKind::Dimension {
                value: -3.0,
                unit: "px".into()
            }
        );
    }

    #[test]
    fn test_scientific_notation_is_float() {
        let toks = kinds("1e2 3.14E+1");
        assert_eq!(
            toks[0],
            TokenKind::Number {
                value: 100.0,
                is_integer: false
            }
        );
        assert_eq!(
            toks[2],
            TokenKind::Number {
                value: 31.4,
                is_integer: false
            }
        );
    }

    #[test]
    fn test_string_tokens() {
        let toks = kinds(r#""hello" 'world'"#);
        assert_eq!(toks[0], TokenKind::String("hello".into()));
        assert_eq!(toks[2], TokenKind::String("world".into()));
    }

    #[test]
    fn test_newline_in_string_is_bad_string() {
        let toks = tokenize("\"abc\ndef\"");
        assert_eq!(toks[0].kind, TokenKind::BadString);
        // The newline is not part of the bad-string token.
        assert_eq!(toks[0].len, 4);
        assert_eq!(toks[1].kind, TokenKind::Whitespace);
    }

    #[test]
    fn test_unterminated_string_keeps_value() {
        let toks = kinds("\"abc");
        assert_eq!(toks[0], TokenKind::String("abc".into()));
    }

    #[test]
    fn test_hash_id_flag() {
        let toks = kinds("#main #12x .cls");
        assert_eq!(
            toks[0],
            TokenKind::Hash {
                value: "main".into(),
                id_valid: true
            }
        );
        assert_eq!(
            toks[2],
            TokenKind::Hash {
                value: "12x".into(),
                id_valid: false
            }
        );
        assert_eq!(toks[4], TokenKind::Delim('.'));
        assert_eq!(toks[5], TokenKind::Ident("cls".into()));
    }

    #[test]
    fn test_at_keyword_and_cdo_cdc() {
        let toks = kinds("@media <!-- -->");
        assert_eq!(toks[0], TokenKind::AtKeyword("media".into()));
        assert_eq!(toks[2], TokenKind::Cdo);
        assert_eq!(toks[4], TokenKind::Cdc);
    }

    #[test]
    fn test_function_token() {
        let toks = kinds("rgb(255, 0, 0)");
        assert_eq!(toks[0], TokenKind::Function("rgb".into()));
        assert_eq!(
            toks[1],
            TokenKind::Number {
                value: 255.0,
                is_integer: true
            }
        );
    }

    #[test]
    fn test_url_tokens() {
        let toks = kinds("url(https://example.com/a.png) url( padded ) url(\"quoted\")");
        assert_eq!(toks[0], TokenKind::Url("https://example.com/a.png".into()));
        assert_eq!(toks[2], TokenKind::Url("padded".into()));
        assert_eq!(toks[4], TokenKind::Function("url".into()));
        assert_eq!(toks[5], TokenKind::String("quoted".into()));
    }

    #[test]
    fn test_bad_url_consumes_to_close_paren() {
        let toks = kinds("url(two words) x");
        assert_eq!(toks[0], TokenKind::BadUrl);
        assert_eq!(toks[2], TokenKind::Ident("x".into()));
    }

    #[test]
    fn test_comments_are_tokens() {
        let toks = kinds("a /* note */ b");
        assert_eq!(toks[0], TokenKind::Ident("a".into()));
        assert_eq!(toks[2], TokenKind::Comment);
        assert_eq!(toks[4], TokenKind::Ident("b".into()));
    }

    #[test]
    fn test_custom_property_ident() {
        let toks = kinds("--main-color: red");
        assert_eq!(toks[0], TokenKind::Ident("--main-color".into()));
        assert_eq!(toks[1], TokenKind::Colon);
    }

    #[test]
    fn test_escapes_in_names() {
        let toks = kinds("\\26 B \\2665");
        assert_eq!(toks[0], TokenKind::Ident("&B".into()));
        assert_eq!(toks[2], TokenKind::Ident("\u{2665}".into()));
    }

    #[test]
    fn test_non_ascii_is_name_continuation() {
        let toks = kinds("naïve café");
        assert_eq!(toks[0], TokenKind::Ident("naïve".into()));
        assert_eq!(toks[2], TokenKind::Ident("café".into()));
    }

    #[test]
    fn test_bad_tokens_record_diagnostics() {
        let mut t = Tokenizer::new("\"a\nb url(x y)");
        let _ = t.tokenize_all();
        let diags = t.take_diagnostics();
        assert!(diags.iter().any(|d| d.message.contains("newline in string")));
        assert!(diags.iter().any(|d| d.message.contains("invalid url()")));
    }
}
