use xml2json::{
    ConvertConfig, ConvertOptions, JsonConfig, Object, Value, convert, from_xml_str, xml_to_json,
    xml_to_json_with_options,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn compact(config: ConvertConfig) -> ConvertOptions {
    ConvertOptions {
        convert: config,
        json: JsonConfig::compact(),
        ..ConvertOptions::default()
    }
}

fn to_compact(xml: &str) -> Result<String, xml2json::Error> {
    xml_to_json_with_options(xml, &compact(ConvertConfig::default()))
}

#[test]
fn test_leaf_text() -> TestResult {
    assert_eq!(to_compact("<root>Hello</root>")?, r#"{"root":"Hello"}"#);
    assert_eq!(xml_to_json("<root>Hello</root>")?, "{\n  \"root\": \"Hello\"\n}\n");
    Ok(())
}

#[test]
fn test_leaf_text_ignores_mixed_content_flag() -> TestResult {
    let options = compact(ConvertConfig {
        preserve_mixed_content: false,
        ..ConvertConfig::default()
    });
    assert_eq!(
        xml_to_json_with_options("<root>  Hello  </root>", &options)?,
        r#"{"root":"Hello"}"#
    );
    Ok(())
}

#[test]
fn test_attributes_with_text() -> TestResult {
    assert_eq!(
        to_compact(r#"<root id="123" type="test">Content</root>"#)?,
        r##"{"root":{"@id":"123","@type":"test","#text":"Content"}}"##
    );
    Ok(())
}

#[test]
fn test_mixed_content_merge() -> TestResult {
    assert_eq!(
        to_compact("<root>Some text<child>Child content</child>More text</root>")?,
        r##"{"root":{"#text":"Some text More text","child":"Child content"}}"##
    );
    Ok(())
}

#[test]
fn test_mixed_content_dropped() -> TestResult {
    let options = compact(ConvertConfig {
        preserve_mixed_content: false,
        ..ConvertConfig::default()
    });
    assert_eq!(
        xml_to_json_with_options(
            r#"<root id="1">Some text<child>Child content</child>More text</root>"#,
            &options
        )?,
        r#"{"root":{"@id":"1","child":"Child content"}}"#
    );
    Ok(())
}

#[test]
fn test_indentation_whitespace_contributes_nothing() -> TestResult {
    let xml = "<root>\n  <a>1</a>\n  <b>2</b>\n</root>\n";
    assert_eq!(to_compact(xml)?, r#"{"root":{"a":"1","b":"2"}}"#);
    Ok(())
}

#[test]
fn test_repeated_tags_become_array() -> TestResult {
    let xml = "<list><item>a</item><other/><item>b</item><item>c</item></list>";
    assert_eq!(
        to_compact(xml)?,
        r#"{"list":{"item":["a","b","c"],"other":{}}}"#
    );
    Ok(())
}

#[test]
fn test_single_child_is_not_wrapped_in_array() -> TestResult {
    assert_eq!(
        to_compact("<list><item>a</item></list>")?,
        r#"{"list":{"item":"a"}}"#
    );
    Ok(())
}

#[test]
fn test_nested_arrays_stay_local() -> TestResult {
    let xml = "<r><g><v>1</v><v>2</v></g><g><v>3</v></g></r>";
    assert_eq!(
        to_compact(xml)?,
        r#"{"r":{"g":[{"v":["1","2"]},{"v":"3"}]}}"#
    );
    Ok(())
}

#[test]
fn test_empty_element_duality() -> TestResult {
    let as_null = compact(ConvertConfig {
        empty_as_null: true,
        ..ConvertConfig::default()
    });

    assert_eq!(to_compact("<empty/>")?, r#"{"empty":{}}"#);
    assert_eq!(xml_to_json_with_options("<empty/>", &as_null)?, r#"{"empty":null}"#);

    assert_eq!(to_compact("<r><empty/></r>")?, r#"{"r":{"empty":{}}}"#);
    assert_eq!(
        xml_to_json_with_options("<r><empty></empty></r>", &as_null)?,
        r#"{"r":{"empty":null}}"#
    );

    // whitespace-only content counts as empty
    assert_eq!(
        xml_to_json_with_options("<r><empty>  \n </empty></r>", &as_null)?,
        r#"{"r":{"empty":null}}"#
    );
    Ok(())
}

#[test]
fn test_element_with_only_attributes() -> TestResult {
    assert_eq!(
        to_compact(r#"<img src="a.png"/>"#)?,
        r#"{"img":{"@src":"a.png"}}"#
    );
    Ok(())
}

#[test]
fn test_namespaced_keys() -> TestResult {
    let xml = r#"<feed xmlns="urn:atom" xmlns:m="urn:meta" m:lang="en"><entry id="1"><m:tag>x</m:tag></entry></feed>"#;
    assert_eq!(
        to_compact(xml)?,
        r#"{"{urn:atom}feed":{"@{urn:meta}lang":"en","{urn:atom}entry":{"@id":"1","{urn:meta}tag":"x"}}}"#
    );
    Ok(())
}

#[test]
fn test_strip_namespaces_is_consistent() -> TestResult {
    let xml = r#"<feed xmlns="urn:atom" xmlns:m="urn:meta" m:lang="en"><entry id="1"><m:tag>x</m:tag></entry></feed>"#;
    let options = compact(ConvertConfig {
        strip_namespaces: true,
        ..ConvertConfig::default()
    });
    let json = xml_to_json_with_options(xml, &options)?;
    assert_eq!(json, r#"{"feed":{"@lang":"en","entry":{"@id":"1","tag":"x"}}}"#);
    assert!(!json.contains("urn:"));
    Ok(())
}

#[test]
fn test_stripped_names_aggregate() -> TestResult {
    let xml = r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:v>1</a:v><b:v>2</b:v></r>"#;
    let options = compact(ConvertConfig {
        strip_namespaces: true,
        ..ConvertConfig::default()
    });
    assert_eq!(
        xml_to_json_with_options(xml, &options)?,
        r#"{"r":{"v":["1","2"]}}"#
    );
    assert_eq!(
        to_compact(xml)?,
        r#"{"r":{"{urn:a}v":"1","{urn:b}v":"2"}}"#
    );
    Ok(())
}

#[test]
fn test_root_wrapper_toggle_is_projection() -> TestResult {
    let document = from_xml_str(
        r#"<order id="7"><line sku="a">2</line><line sku="b">1</line>note</order>"#,
    )?;
    let wrapped = convert(&document.root, &ConvertConfig::default());
    let unwrapped = convert(
        &document.root,
        &ConvertConfig {
            preserve_root: false,
            ..ConvertConfig::default()
        },
    );

    let Some(outer) = wrapped.as_object() else {
        return Err("wrapped output is not an object".into());
    };
    assert_eq!(outer.len(), 1);
    assert_eq!(outer.get("order"), Some(&unwrapped));
    Ok(())
}

#[test]
fn test_unwrapped_leaf_root() -> TestResult {
    let options = compact(ConvertConfig {
        preserve_root: false,
        ..ConvertConfig::default()
    });
    assert_eq!(xml_to_json_with_options("<root>Hello</root>", &options)?, r#""Hello""#);
    assert_eq!(xml_to_json_with_options("<root/>", &options)?, "{}");
    Ok(())
}

#[test]
fn test_entities_and_cdata() -> TestResult {
    let xml = "<r a=\"&lt;&amp;&gt;\">x &#65;&#x42; <![CDATA[<raw>]]></r>";
    assert_eq!(
        to_compact(xml)?,
        r##"{"r":{"@a":"<&>","#text":"x AB <raw>"}}"##
    );
    Ok(())
}

#[test]
fn test_comments_and_prolog_are_skipped() -> TestResult {
    let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- head -->\n<!DOCTYPE r>\n<r>a<!-- c -->b<?pi x?></r>\n<!-- tail -->\n";
    assert_eq!(to_compact(xml)?, r#"{"r":"ab"}"#);
    Ok(())
}

#[test]
fn test_unicode_is_kept() -> TestResult {
    assert_eq!(to_compact("<r>日本語 ✓</r>")?, r#"{"r":"日本語 ✓"}"#);
    Ok(())
}

#[test]
fn test_parse_errors_are_reported() {
    for xml in [
        "",
        "<root>",
        "<root></other>",
        "<root a=\"1\" a=\"2\"/>",
        "<p:root/>",
        "<root>&unknown;</root>",
        "<root/><second/>",
    ] {
        assert!(to_compact(xml).is_err(), "expected an error for {xml:?}");
    }
}

#[test]
fn test_error_position() {
    let Err(err) = to_compact("<root>\n  <child>\n</root>") else {
        panic!("mismatched tag was accepted");
    };
    assert_eq!(err.span().start.line, 3);
}

#[test]
fn test_deep_nesting_converts_on_small_stack() -> TestResult {
    let depth = 200_000;
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let xml = format!("{}x{}", "<n>".repeat(depth), "</n>".repeat(depth));
            let options = ConvertOptions {
                xml: xml2json::XmlConfig::unlimited(),
                json: JsonConfig::compact(),
                ..ConvertOptions::default()
            };
            xml_to_json_with_options(xml.as_str(), &options)
        })?;
    let json = worker.join().map_err(|_| "conversion thread panicked")??;

    let expected = format!("{}\"x\"{}", r#"{"n":"#.repeat(depth), "}".repeat(depth));
    assert_eq!(json, expected);
    Ok(())
}

#[test]
fn test_depth_limit_allows_u16_max() -> TestResult {
    let depth = usize::from(u16::MAX);
    let worker = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || {
            let xml = format!("{}{}", "<n>".repeat(depth), "</n>".repeat(depth));
            let options = ConvertOptions {
                xml: xml2json::XmlConfig::new(u16::MAX, 0),
                json: JsonConfig::compact(),
                ..ConvertOptions::default()
            };
            xml_to_json_with_options(xml.as_str(), &options).map(|json| json.len())
        })?;
    let len = worker.join().map_err(|_| "conversion thread panicked")??;

    // `{"n":` per level, `{}` for the innermost element and a closing brace per level
    assert_eq!(len, depth * 5 + 2 + depth);
    Ok(())
}

#[test]
fn test_depth_limit() {
    let xml = format!("{}{}", "<n>".repeat(600), "</n>".repeat(600));
    assert!(to_compact(&xml).is_err());
}

#[test]
fn test_value_accessors() -> TestResult {
    let document = from_xml_str("<r><a>1</a><a>2</a></r>")?;
    let value = convert(&document.root, &ConvertConfig::default());
    let items = value
        .get("r")
        .and_then(|r| r.get("a"))
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_string).collect::<Vec<_>>());
    assert_eq!(items, Some(vec!["1", "2"]));

    let empty: Object = Object::new();
    assert!(Value::Object(empty).as_object().is_some_and(Object::is_empty));
    Ok(())
}
