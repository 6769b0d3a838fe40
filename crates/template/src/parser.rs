//! Template XML compilation
//!
//! Reads the `<jasperReport>` dialect into a [`CompiledTemplate`] and checks
//! it for the errors a fill would otherwise hit halfway through.

use crate::expression::Expression;
use crate::schema::*;
use crate::{Result, TemplateError, IS_IGNORE_PAGINATION};
use pdf_core::Color;
use roxmltree::{Document, Node, ParsingOptions};
use std::collections::HashSet;
use tracing::debug;

/// Parameters every template may reference without declaring them
const BUILTIN_PARAMETERS: &[&str] = &[IS_IGNORE_PAGINATION, "REPORT_PARAMETERS_MAP"];

/// Tolerance for element boxes touching the band edge
const EPSILON: f64 = 1e-6;

/// Compile template source into a fill-ready template
pub fn compile(source: &str) -> Result<CompiledTemplate> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(source, options)?;
    let root = doc.root_element();

    let root_tag = root.tag_name().name();
    if root_tag != "jasperReport" && root_tag != "report" {
        return Err(TemplateError::ParseError(format!(
            "root element must be <jasperReport>, found <{root_tag}>"
        )));
    }

    let page = page_setup(root)?;
    let mut template = CompiledTemplate {
        name: root.attribute("name").unwrap_or("report").to_string(),
        page,
        parameters: Vec::new(),
        fields: Vec::new(),
        bands: Bands::default(),
    };

    for child in root.children().filter(Node::is_element) {
        let tag = child.tag_name().name();
        match tag {
            "parameter" => {
                let param = parameter(child)?;
                if template.parameter(&param.name).is_some() {
                    return Err(TemplateError::ParseError(format!(
                        "duplicate parameter '{}'",
                        param.name
                    )));
                }
                template.parameters.push(param);
            }
            "field" => {
                let field = field(child)?;
                if template.field(&field.name).is_some() {
                    return Err(TemplateError::ParseError(format!(
                        "duplicate field '{}'",
                        field.name
                    )));
                }
                template.fields.push(field);
            }
            _ => match BandKind::from_tag(tag) {
                Some(kind) => {
                    for band_node in children_named(child, "band") {
                        let band = band(band_node, kind)?;
                        template.bands.section_mut(kind).push(band);
                    }
                }
                None => debug!(element = tag, "ignoring unsupported template element"),
            },
        }
    }

    validate(&template)?;

    debug!(
        name = %template.name,
        fields = template.fields.len(),
        parameters = template.parameters.len(),
        "compiled template"
    );
    Ok(template)
}

fn page_setup(root: Node) -> Result<PageSetup> {
    let defaults = PageSetup::default();
    let width = attr_f64(root, "pageWidth", defaults.width)?;
    let left_margin = attr_f64(root, "leftMargin", defaults.left_margin)?;
    let right_margin = attr_f64(root, "rightMargin", defaults.right_margin)?;

    let page = PageSetup {
        width,
        height: attr_f64(root, "pageHeight", defaults.height)?,
        left_margin,
        right_margin,
        top_margin: attr_f64(root, "topMargin", defaults.top_margin)?,
        bottom_margin: attr_f64(root, "bottomMargin", defaults.bottom_margin)?,
        column_width: attr_f64(root, "columnWidth", width - left_margin - right_margin)?,
    };

    if page.width <= 0.0 || page.body_height() <= 0.0 {
        return Err(TemplateError::ParseError(format!(
            "page {}x{} leaves no room for content",
            page.width, page.height
        )));
    }
    Ok(page)
}

fn parameter(node: Node) -> Result<ParameterDescriptor> {
    let name = required_name(node, "parameter")?;
    let default_value = child(node, "defaultValueExpression")
        .map(|expr| Expression::parse(&text_of(expr)))
        .transpose()?;

    Ok(ParameterDescriptor {
        name,
        field_type: FieldType::from_class(node.attribute("class").unwrap_or("java.lang.String")),
        default_value,
    })
}

fn field(node: Node) -> Result<FieldDescriptor> {
    Ok(FieldDescriptor {
        name: required_name(node, "field")?,
        field_type: FieldType::from_class(node.attribute("class").unwrap_or("java.lang.String")),
    })
}

fn band(node: Node, kind: BandKind) -> Result<Band> {
    let height = attr_f64(node, "height", 0.0)?;
    let print_when = child(node, "printWhenExpression")
        .map(|expr| Expression::parse(&text_of(expr)))
        .transpose()?;

    let mut elements = Vec::new();
    for element_node in node.children().filter(Node::is_element) {
        let tag = element_node.tag_name().name();
        let element = match tag {
            "staticText" => static_text(element_node)?,
            "textField" => text_field(element_node)?,
            "line" => line(element_node)?,
            "rectangle" => rectangle(element_node)?,
            "printWhenExpression" => continue,
            _ => {
                debug!(element = tag, band = kind.tag(), "ignoring unsupported band element");
                continue;
            }
        };

        let frame = &element.frame;
        if frame.y < 0.0 || frame.y + frame.height > height + EPSILON {
            return Err(TemplateError::ParseError(format!(
                "<{tag}> at y={} with height {} does not fit in the {} band of height {height}",
                frame.y,
                frame.height,
                kind.tag()
            )));
        }
        elements.push(element);
    }

    Ok(Band {
        height,
        print_when,
        elements,
    })
}

fn static_text(node: Node) -> Result<Element> {
    Ok(Element {
        frame: frame(node, false)?,
        kind: ElementKind::StaticText {
            text: child(node, "text").map(text_of).unwrap_or_default(),
            style: text_style(node)?,
        },
    })
}

fn text_field(node: Node) -> Result<Element> {
    let expression = match child(node, "textFieldExpression") {
        Some(expr) => Expression::parse(&text_of(expr))?,
        None => {
            return Err(TemplateError::ParseError(
                "<textField> without <textFieldExpression>".to_string(),
            ))
        }
    };

    let evaluation_time = match node.attribute("evaluationTime").unwrap_or("Now") {
        "Now" => EvaluationTime::Now,
        "Report" => EvaluationTime::Report,
        other => {
            return Err(TemplateError::ParseError(format!(
                "unsupported evaluationTime '{other}'"
            )))
        }
    };

    Ok(Element {
        frame: frame(node, false)?,
        kind: ElementKind::TextField {
            expression,
            style: text_style(node)?,
            pattern: node
                .attribute("pattern")
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
            blank_when_null: attr_bool(node, "isBlankWhenNull", false)?,
            evaluation_time,
        },
    })
}

fn line(node: Node) -> Result<Element> {
    let direction = match node.attribute("direction").unwrap_or("TopDown") {
        "BottomUp" => LineDirection::BottomUp,
        _ => LineDirection::TopDown,
    };
    Ok(Element {
        frame: frame(node, false)?,
        kind: ElementKind::Line {
            width: pen_width(node)?,
            direction,
        },
    })
}

fn rectangle(node: Node) -> Result<Element> {
    Ok(Element {
        frame: frame(node, true)?,
        kind: ElementKind::Rectangle {
            line_width: pen_width(node)?,
        },
    })
}

/// `<graphicElement><pen lineWidth/></graphicElement>`, 1pt when absent
fn pen_width(node: Node) -> Result<f64> {
    match child(node, "graphicElement").and_then(|g| child(g, "pen")) {
        Some(pen) => attr_f64(pen, "lineWidth", 1.0),
        None => Ok(1.0),
    }
}

fn frame(node: Node, opaque_by_default: bool) -> Result<ElementFrame> {
    let Some(re) = child(node, "reportElement") else {
        return Err(TemplateError::ParseError(format!(
            "<{}> without <reportElement>",
            node.tag_name().name()
        )));
    };

    let opaque = match re.attribute("mode") {
        Some("Opaque") => true,
        Some("Transparent") => false,
        Some(other) => {
            return Err(TemplateError::ParseError(format!("unsupported mode '{other}'")))
        }
        None => opaque_by_default,
    };

    Ok(ElementFrame {
        x: attr_f64(re, "x", 0.0)?,
        y: attr_f64(re, "y", 0.0)?,
        width: attr_f64(re, "width", 0.0)?,
        height: attr_f64(re, "height", 0.0)?,
        forecolor: attr_color(re, "forecolor", Color::black())?,
        backcolor: attr_color(re, "backcolor", Color::white())?,
        opaque,
    })
}

fn text_style(node: Node) -> Result<TextStyle> {
    let Some(te) = child(node, "textElement") else {
        return Ok(TextStyle::default());
    };

    let horizontal = match te.attribute("textAlignment").unwrap_or("Left") {
        "Center" => HorizontalAlign::Center,
        "Right" => HorizontalAlign::Right,
        "Justified" => HorizontalAlign::Justified,
        _ => HorizontalAlign::Left,
    };
    let vertical = match te.attribute("verticalAlignment").unwrap_or("Top") {
        "Middle" => VerticalAlign::Middle,
        "Bottom" => VerticalAlign::Bottom,
        _ => VerticalAlign::Top,
    };

    let defaults = FontSpec::default();
    let font = match child(te, "font") {
        Some(font) => FontSpec {
            name: font
                .attribute("fontName")
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            size: attr_f64(font, "size", defaults.size)?,
            bold: attr_bool(font, "isBold", false)?,
            italic: attr_bool(font, "isItalic", false)?,
        },
        None => defaults,
    };

    Ok(TextStyle {
        horizontal,
        vertical,
        font,
    })
}

/// Checks that need the whole template: references and band heights
fn validate(template: &CompiledTemplate) -> Result<()> {
    let fields: HashSet<&str> = template.fields.iter().map(|f| f.name.as_str()).collect();
    let parameters: HashSet<&str> = template
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .chain(BUILTIN_PARAMETERS.iter().copied())
        .collect();

    let check = |expr: &Expression| -> Result<()> {
        if let Some(name) = expr.field_refs().into_iter().find(|n| !fields.contains(n)) {
            return Err(TemplateError::ParseError(format!(
                "expression references undeclared field '{name}'"
            )));
        }
        if let Some(name) = expr.parameter_refs().into_iter().find(|n| !parameters.contains(n)) {
            return Err(TemplateError::ParseError(format!(
                "expression references undeclared parameter '{name}'"
            )));
        }
        Ok(())
    };

    for param in &template.parameters {
        if let Some(default) = &param.default_value {
            if !default.field_refs().is_empty() {
                return Err(TemplateError::ParseError(format!(
                    "default value of parameter '{}' cannot reference fields",
                    param.name
                )));
            }
            check(default)?;
        }
    }

    let body = template.page.body_height();
    for (kind, band) in template.bands.iter() {
        if band.height > body + EPSILON {
            return Err(TemplateError::ParseError(format!(
                "{} band height {} exceeds the page body height {body}",
                kind.tag(),
                band.height
            )));
        }
        if let Some(expr) = &band.print_when {
            check(expr)?;
        }
        for element in &band.elements {
            if let ElementKind::TextField { expression, .. } = &element.kind {
                check(expression)?;
            }
        }
    }

    let fixed = template.bands.height(BandKind::Title)
        + template.bands.height(BandKind::PageHeader)
        + template.bands.height(BandKind::ColumnHeader)
        + template.bands.height(BandKind::ColumnFooter)
        + template.bands.height(BandKind::PageFooter);
    let tallest_detail = template
        .bands
        .detail
        .iter()
        .map(|band| band.height)
        .fold(0.0, f64::max);
    if fixed + tallest_detail > body + EPSILON {
        return Err(TemplateError::ParseError(format!(
            "first page bands need {} points but the page body is {body}",
            fixed + tallest_detail
        )));
    }

    Ok(())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

/// Concatenated text content, CDATA included
fn text_of(node: Node) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn required_name(node: Node, what: &str) -> Result<String> {
    match node.attribute("name").map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(TemplateError::ParseError(format!("<{what}> without a name"))),
    }
}

fn attr_f64(node: Node, name: &str, default: f64) -> Result<f64> {
    match node.attribute(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                TemplateError::ParseError(format!(
                    "invalid value '{raw}' for {name} on <{}>",
                    node.tag_name().name()
                ))
            }),
    }
}

fn attr_bool(node: Node, name: &str, default: bool) -> Result<bool> {
    match node.attribute(name).map(str::trim) {
        None => Ok(default),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(raw) => Err(TemplateError::ParseError(format!(
            "invalid value '{raw}' for {name}, expected true or false"
        ))),
    }
}

fn attr_color(node: Node, name: &str, default: Color) -> Result<Color> {
    match node.attribute(name) {
        None => Ok(default),
        Some(raw) => Color::from_hex(raw.trim()).ok_or_else(|| {
            TemplateError::ParseError(format!("invalid color '{raw}' for {name}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<jasperReport xmlns="http://jasperreports.sourceforge.net/jasperreports" name="minimal"
    pageWidth="400" pageHeight="300" columnWidth="360"
    leftMargin="20" rightMargin="20" topMargin="10" bottomMargin="10">
    <parameter name="TITLE" class="java.lang.String">
        <defaultValueExpression><![CDATA["Untitled"]]></defaultValueExpression>
    </parameter>
    <field name="name" class="java.lang.String"/>
    <field name="total" class="java.lang.Double"/>
    <title>
        <band height="30">
            <textField>
                <reportElement x="0" y="0" width="360" height="30" forecolor="#336699"/>
                <textElement textAlignment="Center" verticalAlignment="Middle">
                    <font fontName="Helvetica" size="16" isBold="true"/>
                </textElement>
                <textFieldExpression><![CDATA[$P{TITLE}]]></textFieldExpression>
            </textField>
        </band>
    </title>
    <detail>
        <band height="20">
            <staticText>
                <reportElement x="0" y="0" width="100" height="20"/>
                <text><![CDATA[Name:]]></text>
            </staticText>
            <textField pattern="#,##0.00" isBlankWhenNull="true">
                <reportElement x="100" y="0" width="100" height="20"/>
                <textFieldExpression><![CDATA[$F{total}]]></textFieldExpression>
            </textField>
            <line direction="BottomUp">
                <reportElement x="0" y="19" width="360" height="1"/>
                <graphicElement><pen lineWidth="0.5"/></graphicElement>
            </line>
        </band>
    </detail>
</jasperReport>"##;

    fn with_detail(detail: &str) -> String {
        format!(
            r#"<jasperReport name="t"><field name="a"/><detail>{detail}</detail></jasperReport>"#
        )
    }

    fn parse_error(source: &str) -> String {
        match compile(source) {
            Err(TemplateError::ParseError(msg)) => msg,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_minimal() {
        let template = compile(MINIMAL).unwrap();
        assert_eq!(template.name, "minimal");
        assert_eq!(template.page.width, 400.0);
        assert_eq!(template.page.top_margin, 10.0);
        assert_eq!(template.page.column_width, 360.0);
        assert_eq!(template.fields().len(), 2);
        assert_eq!(template.field("total").unwrap().field_type, FieldType::Decimal);
        assert_eq!(
            template.parameter("TITLE").unwrap().default_value,
            Some(Expression::Literal("Untitled".into()))
        );
        assert_eq!(template.bands.title.len(), 1);
        assert_eq!(template.bands.detail[0].elements.len(), 3);
    }

    #[test]
    fn test_compile_element_attributes() {
        let template = compile(MINIMAL).unwrap();
        let title = &template.bands.title[0].elements[0];
        assert_eq!(title.frame.forecolor.to_hex(), "#336699");
        assert!(!title.frame.opaque);
        let ElementKind::TextField { style, .. } = &title.kind else {
            panic!("expected text field");
        };
        assert_eq!(style.horizontal, HorizontalAlign::Center);
        assert_eq!(style.vertical, VerticalAlign::Middle);
        assert_eq!(style.font.name.as_deref(), Some("Helvetica"));
        assert_eq!(style.font.size, 16.0);
        assert!(style.font.bold);

        let detail = &template.bands.detail[0].elements;
        assert_eq!(
            detail[0].kind,
            ElementKind::StaticText {
                text: "Name:".into(),
                style: TextStyle::default(),
            }
        );
        let ElementKind::TextField {
            pattern,
            blank_when_null,
            evaluation_time,
            ..
        } = &detail[1].kind
        else {
            panic!("expected text field");
        };
        assert_eq!(pattern.as_deref(), Some("#,##0.00"));
        assert!(*blank_when_null);
        assert_eq!(*evaluation_time, EvaluationTime::Now);
        assert_eq!(
            detail[2].kind,
            ElementKind::Line {
                width: 0.5,
                direction: LineDirection::BottomUp,
            }
        );
    }

    #[test]
    fn test_rectangle_defaults_to_opaque() {
        let template = compile(&with_detail(
            r#"<band height="20"><rectangle><reportElement x="0" y="0" width="50" height="20"/></rectangle></band>"#,
        ))
        .unwrap();
        let rect = &template.bands.detail[0].elements[0];
        assert!(rect.frame.opaque);
        assert_eq!(rect.kind, ElementKind::Rectangle { line_width: 1.0 });
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            compile("<jasperReport><detail>"),
            Err(TemplateError::XmlError(_))
        ));
    }

    #[test]
    fn test_wrong_root() {
        assert!(parse_error("<html/>").contains("<html>"));
    }

    #[test]
    fn test_field_errors() {
        assert!(parse_error(r#"<report><field class="java.lang.String"/></report>"#)
            .contains("without a name"));
        assert!(parse_error(r#"<report><field name="a"/><field name="a"/></report>"#)
            .contains("duplicate field 'a'"));
    }

    #[test]
    fn test_invalid_number() {
        assert!(parse_error(r#"<report pageWidth="wide"/>"#).contains("'wide'"));
    }

    #[test]
    fn test_undeclared_references() {
        let msg = parse_error(&with_detail(
            r#"<band height="20"><textField><reportElement x="0" y="0" width="50" height="20"/><textFieldExpression>$F{b}</textFieldExpression></textField></band>"#,
        ));
        assert!(msg.contains("undeclared field 'b'"));

        let msg = parse_error(&with_detail(
            r#"<band height="20"><printWhenExpression>$P{SHOW}</printWhenExpression></band>"#,
        ));
        assert!(msg.contains("undeclared parameter 'SHOW'"));

        // built-in parameters need no declaration
        compile(&with_detail(
            r#"<band height="20"><printWhenExpression>$P{IS_IGNORE_PAGINATION}</printWhenExpression></band>"#,
        ))
        .unwrap();
    }

    #[test]
    fn test_bad_expression() {
        let result = compile(&with_detail(
            r#"<band height="20"><textField><reportElement x="0" y="0" width="50" height="20"/><textFieldExpression>new Date()</textFieldExpression></textField></band>"#,
        ));
        assert!(matches!(result, Err(TemplateError::ExpressionError { .. })));
    }

    #[test]
    fn test_band_too_tall() {
        let msg = parse_error(&with_detail(r#"<band height="900"/>"#));
        assert!(msg.contains("exceeds the page body height"));
    }

    #[test]
    fn test_element_outside_band() {
        let msg = parse_error(&with_detail(
            r#"<band height="20"><staticText><reportElement x="0" y="10" width="50" height="20"/><text>x</text></staticText></band>"#,
        ));
        assert!(msg.contains("does not fit in the detail band"));
    }

    #[test]
    fn test_multiple_detail_bands() {
        let template =
            compile(&with_detail(r#"<band height="20"/><band height="15"/>"#)).unwrap();
        assert_eq!(template.bands.detail.len(), 2);
        assert_eq!(template.bands.height(BandKind::Detail), 35.0);
    }
}
