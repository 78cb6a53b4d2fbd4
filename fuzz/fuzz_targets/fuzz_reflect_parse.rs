#![no_main]

use libfuzzer_sys::fuzz_target;
use jsreflect_core::{ErrorKind, ReflectOptions, reflect_parse};

fuzz_target!(|data: &[u8]| {
    // Arbitrary UTF-8 through the whole pipeline.  The first byte picks the
    // options so both location modes and a tight depth bound get coverage:
    //   bit 0 → locations on
    //   bit 1 → max depth 32 instead of the default
    let Some((&flags, rest)) = data.split_first() else {
        return;
    };
    let Ok(src) = std::str::from_utf8(rest) else {
        return;
    };

    let mut opts = ReflectOptions::new().loc(flags & 1 != 0);
    if flags & 2 != 0 {
        opts = opts.max_depth(32);
    }

    match reflect_parse(src, &opts) {
        Ok(ast) => {
            assert_eq!(ast.node_type(), Some("Program"));
            let _ = ast.to_json();
        }
        // Producer and serializer must agree on every tree shape.
        Err(err) => assert_ne!(err.kind(), ErrorKind::Internal, "{err} for {src:?}"),
    }
});
