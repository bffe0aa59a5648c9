//! Atlassian Document Format (ADF) builder for enrichment comments.
//!
//! Jira's v3 comment endpoint only accepts rich-text documents. Comment
//! text is produced as `Label: value` lines; each line becomes one
//! paragraph whose label is rendered bold.

use serde::Serialize;

/// ADF version marker required by the comment endpoint.
pub const ADF_VERSION: u32 = 1;

/// Top-level `{"type": "doc", "version": 1, "content": [...]}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "doc")]
pub struct Document {
    pub version: u32,
    pub content: Vec<Block>,
}

impl Document {
    pub fn new(content: Vec<Block>) -> Self {
        Self {
            version: ADF_VERSION,
            content,
        }
    }
}

/// Block-level node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph { content: Vec<TextRun> },
}

/// Inline text node with optional formatting marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "text")]
pub struct TextRun {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn strong(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: vec![Mark::Strong],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mark {
    Strong,
}

/// Build a document from multi-line `Label: value` text.
///
/// Blank lines are dropped. A line is split on its first colon: the left
/// side becomes a bold `"Label: "` run and everything after the colon
/// (later colons kept) becomes a plain run. Lines without a colon become
/// a single plain run.
pub fn format_comment(raw: &str) -> Document {
    let content = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(paragraph_for_line)
        .collect();
    Document::new(content)
}

fn paragraph_for_line(line: &str) -> Block {
    let content = match line.split_once(':') {
        Some((label, value)) => {
            let mut runs = vec![TextRun::strong(format!("{}: ", label.trim()))];
            let value = value.trim();
            // ADF rejects empty text nodes.
            if !value.is_empty() {
                runs.push(TextRun::plain(value));
            }
            runs
        }
        None => vec![TextRun::plain(line)],
    };
    Block::Paragraph { content }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn runs_of(block: &Block) -> &[TextRun] {
        match block {
            Block::Paragraph { content } => content,
        }
    }

    #[test]
    fn label_value_line_is_bold_then_plain() {
        let doc = format_comment("Abuse Confidence Score: 100");
        assert_eq!(doc.content.len(), 1);
        let runs = runs_of(&doc.content[0]);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], TextRun::strong("Abuse Confidence Score: "));
        assert_eq!(runs[1], TextRun::plain("100"));
    }

    #[test]
    fn value_keeps_everything_after_first_colon() {
        let doc = format_comment("Time: 10:30:00");
        let runs = runs_of(&doc.content[0]);
        assert_eq!(runs[0].text, "Time: ");
        assert_eq!(runs[1].text, "10:30:00");
    }

    #[test]
    fn line_without_colon_is_single_plain_run() {
        let doc = format_comment("   reputation data follows   ");
        let runs = runs_of(&doc.content[0]);
        assert_eq!(runs, &[TextRun::plain("reputation data follows")]);
        assert!(runs[0].marks.is_empty());
    }

    #[test]
    fn blank_lines_are_dropped_and_order_kept() {
        let raw = "\n        IP Address: 192.168.1.1\n\n        ISP: Test ISP\n        \n";
        let doc = format_comment(raw);
        let labels: Vec<&str> = doc.content.iter().map(|b| runs_of(b)[0].text.as_str()).collect();
        assert_eq!(labels, vec!["IP Address: ", "ISP: "]);
    }

    #[test]
    fn empty_value_emits_label_only() {
        let doc = format_comment("Domain:");
        assert_eq!(runs_of(&doc.content[0]), &[TextRun::strong("Domain: ")]);
    }

    #[test]
    fn empty_input_is_empty_document() {
        let doc = format_comment("  \n \n");
        assert!(doc.content.is_empty());
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({
            "type": "doc", "version": 1, "content": []
        }));
    }

    #[test]
    fn serializes_to_adf() {
        let doc = format_comment("ISP: ExampleNet\nnote");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "doc",
                "version": 1,
                "content": [
                    {
                        "type": "paragraph",
                        "content": [
                            { "type": "text", "text": "ISP: ", "marks": [{ "type": "strong" }] },
                            { "type": "text", "text": "ExampleNet" }
                        ]
                    },
                    {
                        "type": "paragraph",
                        "content": [{ "type": "text", "text": "note" }]
                    }
                ]
            })
        );
    }
}
