use std::ops::Range;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use tracing::debug;

use super::media::MediaStore;
use super::write_failed;
use crate::Result;
use crate::convert::ContentInstruction;
use crate::report::{Placeholder, PlaceholderMap, PlaceholderValue};

const PARAGRAPH: &[u8] = b"w:p";
const PARAGRAPH_PROPS: &[u8] = b"w:pPr";
const RUN: &[u8] = b"w:r";
const RUN_PROPS: &[u8] = b"w:rPr";
const TEXT: &[u8] = b"w:t";
const TAB: &[u8] = b"w:tab";
const BREAK: &[u8] = b"w:br";
const CARRIAGE_RETURN: &[u8] = b"w:cr";

/// A rewritten document part.
pub(crate) struct Rewrite {
    pub xml: String,
    /// Number of placeholder tokens replaced.
    pub replaced: usize,
}

/// Where the interesting pieces of one `w:p` sit in its event list.
#[derive(Debug, Default)]
struct Layout {
    props: Option<Range<usize>>,
    run_props: Option<Range<usize>>,
    text: String,
    nested: bool,
}

impl Layout {
    /// `events` runs from the paragraph's start tag to its end tag inclusive.
    fn analyze(events: &[Event<'_>]) -> Result<Self> {
        let mut layout = Layout::default();
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut props_start = None;
        let mut run_props_start = None;
        let mut first_run: Option<usize> = None;
        let mut first_run_open = false;
        let last = events.len().saturating_sub(1);

        for (index, event) in events.iter().enumerate().take(last).skip(1) {
            let in_first_run = first_run_open && first_run.map(|depth| depth + 1) == Some(stack.len());
            match event {
                Event::Start(e) => {
                    let name = e.name().as_ref().to_vec();
                    match name.as_slice() {
                        PARAGRAPH => layout.nested = true,
                        PARAGRAPH_PROPS if stack.is_empty() => props_start = Some(index),
                        RUN if first_run.is_none() => {
                            first_run = Some(stack.len());
                            first_run_open = true;
                        }
                        RUN_PROPS if in_first_run => run_props_start = Some(index),
                        _ => {}
                    }
                    stack.push(name);
                }
                Event::End(e) => {
                    stack.pop();
                    match e.name().as_ref() {
                        PARAGRAPH_PROPS if stack.is_empty() => {
                            if let Some(start) = props_start.take() {
                                layout.props = Some(start..index + 1);
                            }
                        }
                        RUN_PROPS => {
                            if let Some(start) = run_props_start.take() {
                                layout.run_props = Some(start..index + 1);
                            }
                        }
                        RUN if first_run == Some(stack.len()) => first_run_open = false,
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    let in_run = stack.last().is_some_and(|name| name == RUN);
                    match e.name().as_ref() {
                        PARAGRAPH_PROPS if stack.is_empty() => layout.props = Some(index..index + 1),
                        RUN_PROPS if in_first_run => layout.run_props = Some(index..index + 1),
                        RUN if first_run.is_none() => first_run = Some(stack.len()),
                        TAB if in_run => layout.text.push('\t'),
                        BREAK | CARRIAGE_RETURN if in_run => layout.text.push('\n'),
                        _ => {}
                    }
                }
                Event::Text(t) if stack.last().is_some_and(|name| name == TEXT) => {
                    layout.text.push_str(&t.unescape().map_err(write_failed)?);
                }
                _ => {}
            }
        }

        Ok(layout)
    }
}

/// Rewrites every paragraph of a document part that carries a placeholder.
pub(crate) fn rewrite_document(xml: &str, placeholders: &PlaceholderMap, media: &mut MediaStore) -> Result<Rewrite> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut paragraph: Vec<Event<'_>> = Vec::new();
    let mut depth = 0usize;
    let mut replaced = 0;

    loop {
        let event = reader.read_event().map_err(write_failed)?;
        if matches!(event, Event::Eof) {
            if depth > 0 {
                return Err(write_failed("document ends inside a paragraph"));
            }
            break;
        }

        let opens = matches!(&event, Event::Start(e) if e.name().as_ref() == PARAGRAPH);
        let closes = matches!(&event, Event::End(e) if e.name().as_ref() == PARAGRAPH);

        if depth == 0 && !opens {
            writer.write_event(event).map_err(write_failed)?;
            continue;
        }

        if opens {
            depth += 1;
        } else if closes {
            depth -= 1;
        }
        paragraph.push(event);

        if depth == 0 {
            replaced += write_paragraph(&mut writer, &paragraph, placeholders, media)?;
            paragraph.clear();
        }
    }

    let xml = String::from_utf8(writer.into_inner()).map_err(write_failed)?;
    Ok(Rewrite { xml, replaced })
}

fn write_paragraph(
    writer: &mut Writer<Vec<u8>>, events: &[Event<'_>], placeholders: &PlaceholderMap, media: &mut MediaStore,
) -> Result<usize> {
    let layout = Layout::analyze(events)?;
    if layout.nested {
        debug!("Leaving paragraph with nested paragraphs untouched");
        return write_events(writer, events).map(|_| 0);
    }

    let (text, mut replaced) = substitute(&layout.text, placeholders);

    let rich = match placeholders.get(Placeholder::ReportContent) {
        Some(PlaceholderValue::Rich(content)) if text.contains(Placeholder::ReportContent.token()) => Some(content),
        _ => None,
    };

    if replaced == 0 && rich.is_none() {
        return write_events(writer, events).map(|_| 0);
    }

    let run_props = match &layout.run_props {
        Some(range) => serialize(&events[range.clone()])?,
        None => String::new(),
    };

    let runs = match rich {
        Some(content) => {
            replaced += 1;
            rich_runs(content, &run_props, media)
        }
        None => text_run(&text, &run_props),
    };

    let Some((open, rest)) = events.split_first() else {
        return Ok(replaced);
    };
    writer.write_event(open.borrow()).map_err(write_failed)?;
    if let Some(range) = &layout.props {
        write_events(writer, &events[range.clone()])?;
    }
    writer.get_mut().extend_from_slice(runs.as_bytes());
    if let Some(close) = rest.last() {
        writer.write_event(close.borrow()).map_err(write_failed)?;
    }

    Ok(replaced)
}

/// Replaces text placeholder tokens in one pass; replacement values are not rescanned.
fn substitute(text: &str, placeholders: &PlaceholderMap) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut replaced = 0;

    while let Some(at) = rest.find("{{") {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];

        let Some(placeholder) = Placeholder::ALL.into_iter().find(|p| tail.starts_with(p.token())) else {
            out.push_str("{{");
            rest = &tail[2..];
            continue;
        };

        match placeholders.get(placeholder) {
            Some(PlaceholderValue::Text(value)) => {
                out.push_str(value);
                replaced += 1;
            }
            _ => out.push_str(placeholder.token()),
        }
        rest = &tail[placeholder.token().len()..];
    }

    out.push_str(rest);
    (out, replaced)
}

/// Run content for text with `\n` as breaks and `\t` as tabs.
fn run_content(text: &str) -> String {
    let mut out = String::new();
    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            out.push_str("<w:br/>");
        }
        for (tab_index, segment) in line.split('\t').enumerate() {
            if tab_index > 0 {
                out.push_str("<w:tab/>");
            }
            if !segment.is_empty() {
                out.push_str(r#"<w:t xml:space="preserve">"#);
                out.push_str(&escape(segment));
                out.push_str("</w:t>");
            }
        }
    }
    out
}

fn text_run(text: &str, run_props: &str) -> String {
    format!("<w:r>{}{}</w:r>", run_props, run_content(text))
}

fn rich_runs(content: &[ContentInstruction], run_props: &str, media: &mut MediaStore) -> String {
    let mut out = String::new();
    for instruction in content {
        match instruction {
            ContentInstruction::AppendText(text) => out.push_str(&text_run(text, run_props)),
            ContentInstruction::InsertLineBreak => out.push_str("<w:r><w:br/></w:r>"),
            ContentInstruction::InsertImage(bytes) => {
                if let Some(image) = media.add(bytes.clone()) {
                    out.push_str("<w:r>");
                    out.push_str(&image.drawing_xml());
                    out.push_str("</w:r>");
                }
            }
        }
    }
    out
}

fn write_events(writer: &mut Writer<Vec<u8>>, events: &[Event<'_>]) -> Result<()> {
    for event in events {
        writer.write_event(event.borrow()).map_err(write_failed)?;
    }
    Ok(())
}

fn serialize(events: &[Event<'_>]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_events(&mut writer, events)?;
    String::from_utf8(writer.into_inner()).map_err(write_failed)
}
