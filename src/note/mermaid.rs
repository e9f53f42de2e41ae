//! Mermaid Diagram Validation
//!
//! Structural checks for Mermaid blocks in generated pages. Issues are
//! reported, never repaired: the page is written either way and problems are
//! logged as warnings.

use std::fmt;
use tracing::debug;

// =============================================================================
// Validation Result Types
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct MermaidValidation {
    pub diagrams_found: usize,
    pub diagrams_valid: usize,
    pub issues: Vec<MermaidIssue>,
}

impl MermaidValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MermaidIssue {
    /// 1-based diagram index within the page
    pub diagram_index: usize,
    /// 1-based line in the page
    pub line_number: usize,
    pub issue_type: MermaidIssueType,
    pub description: String,
}

impl fmt::Display for MermaidIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "diagram {} line {}: {}",
            self.diagram_index, self.line_number, self.description
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MermaidIssueType {
    EmptyDiagram,
    InvalidDiagramType,
    UnclosedBlock,
    UnbalancedBrackets,
    MismatchedQuotes,
    InvalidArrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramType {
    Flowchart,
    Sequence,
    Class,
    State,
    Er,
    Other,
}

impl DiagramType {
    fn from_first_line(line: &str) -> Option<Self> {
        let lower = line.trim().to_lowercase();

        if lower.starts_with("graph") || lower.starts_with("flowchart") {
            Some(Self::Flowchart)
        } else if lower.starts_with("sequencediagram") {
            Some(Self::Sequence)
        } else if lower.starts_with("classdiagram") {
            Some(Self::Class)
        } else if lower.starts_with("statediagram") {
            Some(Self::State)
        } else if lower.starts_with("erdiagram") {
            Some(Self::Er)
        } else if ["gantt", "pie", "journey", "gitgraph", "mindmap", "timeline"]
            .iter()
            .any(|kw| lower.starts_with(kw))
        {
            Some(Self::Other)
        } else {
            None
        }
    }
}

/// A fenced Mermaid block: 1-based line of the opening fence, body, closed flag
#[derive(Debug, Clone)]
pub struct MermaidBlock {
    pub start_line: usize,
    pub body: String,
    pub closed: bool,
}

// =============================================================================
// Validator
// =============================================================================

pub struct MermaidValidator;

impl MermaidValidator {
    /// Validate every Mermaid block in a Markdown document
    pub fn validate(content: &str) -> MermaidValidation {
        let blocks = Self::extract_diagrams(content);
        let mut validation = MermaidValidation {
            diagrams_found: blocks.len(),
            ..Default::default()
        };

        for (i, block) in blocks.iter().enumerate() {
            let issues = Self::validate_block(block, i + 1);
            if issues.is_empty() {
                validation.diagrams_valid += 1;
                debug!("Diagram {} at line {} is valid", i + 1, block.start_line);
            } else {
                validation.issues.extend(issues);
            }
        }

        validation
    }

    pub fn extract_diagrams(content: &str) -> Vec<MermaidBlock> {
        let mut blocks = Vec::new();
        let mut current: Option<MermaidBlock> = None;

        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            match current.as_mut() {
                None if trimmed == "```mermaid" || trimmed.starts_with("```mermaid ") => {
                    current = Some(MermaidBlock {
                        start_line: idx + 1,
                        body: String::new(),
                        closed: false,
                    });
                }
                Some(block) if trimmed == "```" => {
                    block.closed = true;
                    blocks.extend(current.take());
                }
                Some(block) => {
                    block.body.push_str(line);
                    block.body.push('\n');
                }
                None => {}
            }
        }

        blocks.extend(current);
        blocks
    }

    fn validate_block(block: &MermaidBlock, index: usize) -> Vec<MermaidIssue> {
        let issue = |line_number: usize, issue_type, description: String| MermaidIssue {
            diagram_index: index,
            line_number,
            issue_type,
            description,
        };
        let mut issues = Vec::new();

        if !block.closed {
            issues.push(issue(
                block.start_line,
                MermaidIssueType::UnclosedBlock,
                "Mermaid code fence is never closed".to_string(),
            ));
        }

        let body = block.body.trim();
        if body.is_empty() {
            issues.push(issue(
                block.start_line,
                MermaidIssueType::EmptyDiagram,
                "Diagram is empty".to_string(),
            ));
            return issues;
        }

        let first_line = body.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
        let Some(diagram_type) = DiagramType::from_first_line(first_line) else {
            issues.push(issue(
                block.start_line,
                MermaidIssueType::InvalidDiagramType,
                format!(
                    "Unknown diagram type: '{}'",
                    first_line.chars().take(30).collect::<String>()
                ),
            ));
            return issues;
        };

        if diagram_type == DiagramType::Flowchart {
            // body lines start one line after the opening fence
            for (offset, line) in block.body.lines().enumerate().skip(1) {
                if Self::broken_edge(line.trim()) {
                    issues.push(issue(
                        block.start_line + 1 + offset,
                        MermaidIssueType::InvalidArrow,
                        format!("Edge has no source or target: '{}'", line.trim()),
                    ));
                }
            }
        }

        if let Some(description) = Self::bracket_imbalance(body) {
            issues.push(issue(
                block.start_line,
                MermaidIssueType::UnbalancedBrackets,
                description,
            ));
        }

        let quotes = body.matches('"').count() - body.matches("\\\"").count();
        if quotes % 2 != 0 {
            issues.push(issue(
                block.start_line,
                MermaidIssueType::MismatchedQuotes,
                "Unmatched double quotes".to_string(),
            ));
        }

        issues
    }

    /// An arrow line with nothing on either side of the arrow
    fn broken_edge(line: &str) -> bool {
        if line.is_empty() || line.starts_with("%%") {
            return false;
        }
        let Some((idx, arrow)) = ["-.->", "==>", "-->", "---"]
            .iter()
            .filter_map(|a| line.find(a).map(|i| (i, *a)))
            .min_by_key(|(i, _)| *i)
        else {
            return false;
        };

        let source = line[..idx].trim();
        let mut target = line[idx + arrow.len()..].trim();
        if let Some(labelled) = target.strip_prefix('|') {
            target = labelled.split_once('|').map(|(_, t)| t.trim()).unwrap_or("");
        }
        source.is_empty() || target.is_empty()
    }

    fn bracket_imbalance(content: &str) -> Option<String> {
        let (mut brace, mut bracket, mut paren) = (0i32, 0i32, 0i32);
        let mut in_string = false;

        for ch in content.chars() {
            if ch == '"' {
                in_string = !in_string;
                continue;
            }
            if in_string {
                continue;
            }
            match ch {
                '{' => brace += 1,
                '}' => brace -= 1,
                '[' => bracket += 1,
                ']' => bracket -= 1,
                '(' => paren += 1,
                ')' => paren -= 1,
                _ => {}
            }
            if brace < 0 || bracket < 0 || paren < 0 {
                return Some("Closing bracket without matching opening".to_string());
            }
        }

        (brace != 0 || bracket != 0 || paren != 0).then(|| {
            format!(
                "Unbalanced brackets: braces={}, brackets={}, parens={}",
                brace, bracket, paren
            )
        })
    }
}
