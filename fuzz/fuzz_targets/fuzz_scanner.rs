#![no_main]

use libfuzzer_sys::fuzz_target;
use jsreflect_core::parser::scanner::{Scanner, TokenKind};

fuzz_target!(|data: &[u8]| {
    let Ok(src) = std::str::from_utf8(data) else {
        return;
    };

    // Token spans must be non-empty, ordered and inside the source.
    let mut scanner = Scanner::new(src);
    let mut last_end = 0usize;
    loop {
        let tok = match scanner.next_token() {
            Ok(tok) => tok,
            Err(_) => return,
        };
        if tok.kind == TokenKind::Eof {
            break;
        }
        assert!(tok.span.start.offset >= last_end, "overlapping token {tok:?}");
        assert!(tok.span.end.offset > tok.span.start.offset, "empty token {tok:?}");
        assert!(tok.span.end.offset <= src.len());
        last_end = tok.span.end.offset;
    }
});
