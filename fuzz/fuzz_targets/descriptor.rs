#![no_main]

use eventscope::ir::{MethodAccess, MethodBody, MethodSignature, TypeDesc};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(signature) = MethodSignature::parse(text) {
            let body = MethodBody::new("a/B", "m", signature, MethodAccess::PUBLIC);
            let _ = body.required_max_locals();
            let _ = body.parameter_slots();
        }
        let _ = TypeDesc::parse(text);
    }
});
