#![no_main]

use libfuzzer_sys::fuzz_target;
use xml2json::{ConvertConfig, ConvertOptions, Input, JsonConfig, xml_to_json_with_options};

fuzz_target!(|data: &[u8]| {
    let options = ConvertOptions {
        convert: ConvertConfig {
            strip_namespaces: data.len() % 2 == 0,
            empty_as_null: data.len() % 3 == 0,
            ..ConvertConfig::default()
        },
        json: JsonConfig {
            ensure_ascii: data.len() % 5 == 0,
            ..JsonConfig::default()
        },
        ..ConvertOptions::default()
    };
    if let Ok(json) = xml_to_json_with_options(Input::from_bytes(data), &options) {
        assert!(json.ends_with('\n'));
    }
});
