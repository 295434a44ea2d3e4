//! JaCoCo XML execution reports
//!
//! Only class-level `<counter>` elements are read; method and source-file
//! counters are derived data and would double count.

use super::model::{ClassCoverage, Counter, CounterKind, ExecutionTrace};
use super::trace::TraceError;
use roxmltree::{Document, Node, ParsingOptions};

pub fn parse(content: &str) -> Result<ExecutionTrace, TraceError> {
    // JaCoCo writes a DOCTYPE referencing report.dtd
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(content, options)
        .map_err(|e| TraceError::Malformed(format!("invalid JaCoCo XML: {}", e)))?;

    let root = doc.root_element();
    if !root.has_tag_name("report") {
        return Err(TraceError::Malformed(format!(
            "expected <report> root element, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut classes = Vec::new();
    for node in root.descendants().filter(|n| n.has_tag_name("class")) {
        classes.push(parse_class(node)?);
    }

    Ok(ExecutionTrace { classes })
}

fn parse_class(node: Node) -> Result<ClassCoverage, TraceError> {
    let name = node
        .attribute("name")
        .ok_or_else(|| TraceError::Malformed("<class> element without name".to_string()))?;

    let mut class = ClassCoverage::new(name);
    class.source_file = node.attribute("sourcefilename").map(str::to_string);

    for counter in node.children().filter(|n| n.has_tag_name("counter")) {
        let Some(kind) = counter.attribute("type").and_then(CounterKind::parse) else {
            continue;
        };
        let missed = parse_count(counter, "missed", name)?;
        let covered = parse_count(counter, "covered", name)?;
        let value = Counter::new(missed, covered);
        if value.checked_total().is_none() {
            return Err(TraceError::Malformed(format!(
                "{} counter in class {} overflows",
                kind, name
            )));
        }
        class.counters.insert(kind, value);
    }

    Ok(class)
}

fn parse_count(counter: Node, attr: &str, class: &str) -> Result<u64, TraceError> {
    let raw = counter.attribute(attr).ok_or_else(|| {
        TraceError::Malformed(format!("counter in class {} missing '{}'", class, attr))
    })?;
    raw.trim().parse::<u64>().map_err(|_| {
        TraceError::Malformed(format!(
            "counter '{}' in class {} is not a number: {}",
            attr, class, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="catalog-service">
  <sessioninfo id="host-1" start="1700000000000" dump="1700000001000"/>
  <package name="com/acme/catalog/application/service">
    <class name="com/acme/catalog/application/service/ProductService" sourcefilename="ProductService.java">
      <method name="findAll" desc="()Ljava/util/List;" line="20">
        <counter type="LINE" missed="0" covered="3"/>
      </method>
      <counter type="INSTRUCTION" missed="4" covered="60"/>
      <counter type="BRANCH" missed="1" covered="5"/>
      <counter type="LINE" missed="2" covered="18"/>
      <counter type="METHOD" missed="0" covered="6"/>
      <counter type="CLASS" missed="0" covered="1"/>
    </class>
    <sourcefile name="ProductService.java">
      <counter type="LINE" missed="2" covered="18"/>
    </sourcefile>
    <counter type="LINE" missed="2" covered="18"/>
  </package>
  <counter type="LINE" missed="2" covered="18"/>
</report>"#;

    #[test]
    fn test_parse_class_counters() {
        let trace = parse(REPORT).unwrap();
        assert_eq!(trace.classes.len(), 1);

        let class = &trace.classes[0];
        assert_eq!(class.name, "com/acme/catalog/application/service/ProductService");
        assert_eq!(class.source_file.as_deref(), Some("ProductService.java"));
        assert_eq!(class.counter(CounterKind::Line), Counter::new(2, 18));
        assert_eq!(class.counter(CounterKind::Branch), Counter::new(1, 5));
        assert_eq!(class.counter(CounterKind::Complexity), Counter::default());
    }

    #[test]
    fn test_classes_inside_groups() {
        let xml = r#"<report name="r"><group name="g"><package name="p"><class name="p/A"><counter type="LINE" missed="1" covered="1"/></class></package></group></report>"#;
        let trace = parse(xml).unwrap();
        assert_eq!(trace.classes[0].name, "p/A");
    }

    #[test]
    fn test_rejects_wrong_root() {
        let err = parse("<testsuite/>").unwrap_err();
        assert!(err.to_string().contains("<report>"));
    }

    #[test]
    fn test_rejects_overflowing_counter() {
        let xml = r#"<report name="r"><package name="p"><class name="p/A"><counter type="LINE" missed="18446744073709551615" covered="1"/></class></package></report>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(err, TraceError::Malformed(_)));
        assert!(err.to_string().contains("LINE counter in class p/A overflows"));
    }

    #[test]
    fn test_rejects_bad_counter() {
        let xml = r#"<report name="r"><package name="p"><class name="p/A"><counter type="LINE" missed="x" covered="1"/></class></package></report>"#;
        assert!(matches!(parse(xml), Err(TraceError::Malformed(_))));
    }
}
