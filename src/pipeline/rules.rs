//! Heuristic classifier for shared-mailbox email.
//!
//! Ordered decision procedure, first match wins:
//! 1. Attachment pre-scan → spec sheet present? PO-named PDF present?
//! 2. PO-named PDF without a spec sheet → PO number, PO keyword or forwarded subject
//! 3. Secondary PO signal score (PDF, PO text in body, PO-ish filename)
//! 4. Spec sheet → Quote Requests
//! 5. Quote keywords → Quote Requests
//! 6. Everything else → Needs Attention
//!
//! Pure and deterministic: no I/O, no shared mutable state. The compiled
//! pattern tables are built once and shared read-only.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::types::{Attachment, Category, EmailMessage};

/// Attachment name fragments that mark a spec sheet.
const SPEC_SHEET_NAME_KEYWORDS: &[&str] = &["spec", "specification", "datasheet", "drawing"];

/// Attachment name fragments that mark a PDF as a purchase order.
const PO_ATTACHMENT_NAME_KEYWORDS: &[&str] = &["po", "purchaseorder", "order", "purch"];

/// Whole-word PO keywords for the strong path.
const PO_KEYWORDS: &[&str] = &["purchase order", "po", "p.o."];

/// Whole-word quote keywords.
const QUOTE_KEYWORDS: &[&str] = &[
    "quote",
    "request for quote",
    "rfq",
    "pricing",
    "lead time",
    "estimate",
    "ship time",
];

/// PO number patterns over `subject + " " + body`.
const PO_NUMBER_PATTERNS: &[&str] = &[
    r"p[./]?o\s*(?:number|no\.?|#|num)?\s*:?-?\s*\d+",
    r"purchase order\s*(?:number|no\.?|#|num)?\s*:?-?\s*\d+",
    r"\b\d{6,10}\b",
];

/// Minimum secondary signal score for a PO. Tunable.
const PO_SIGNAL_THRESHOLD: u8 = 2;

/// Subject prefixes that mark a forwarded message.
const FORWARD_PREFIXES: &[&str] = &["fw:", "fwd:"];

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    /// PO-named PDF plus a PO number in subject or body.
    PoNumber,
    /// PO-named PDF plus a whole-word PO keyword.
    PoKeyword,
    /// PO-named PDF on a forwarded message.
    ForwardedPoPdf,
    /// Secondary PO signals reached the threshold.
    PoSignalScore,
    /// Spec sheet attached.
    SpecSheet,
    /// Whole-word quote keyword.
    QuoteKeyword,
    /// No signal matched.
    Default,
}

impl ClassificationRule {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PoNumber => "po_number",
            Self::PoKeyword => "po_keyword",
            Self::ForwardedPoPdf => "forwarded_po_pdf",
            Self::PoSignalScore => "po_signal_score",
            Self::SpecSheet => "spec_sheet",
            Self::QuoteKeyword => "quote_keyword",
            Self::Default => "default",
        }
    }
}

/// A category together with the rule that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub rule: ClassificationRule,
}

/// Lower-cased view of an email, computed once per message.
#[derive(Debug, Clone, Default)]
pub struct ClassificationInput {
    pub subject: String,
    pub body: String,
    /// Attachments with lower-cased names and content types. Empty when the
    /// message-level attachment flag is false.
    pub attachments: Vec<Attachment>,
}

impl ClassificationInput {
    pub fn new(subject: &str, body: &str, has_attachments: bool, attachments: &[Attachment]) -> Self {
        let attachments = if has_attachments {
            attachments
                .iter()
                .map(|a| Attachment {
                    name: a.name.to_lowercase(),
                    content_type: a.content_type.to_lowercase(),
                    ..a.clone()
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            subject: subject.to_lowercase(),
            body: body.to_lowercase(),
            attachments,
        }
    }

    /// Build from a fetched message, using its effective body.
    pub fn from_message(message: &EmailMessage, attachments: &[Attachment]) -> Self {
        Self::new(
            &message.subject,
            message.effective_body(),
            message.has_attachments,
            attachments,
        )
    }

    fn combined_text(&self) -> String {
        format!("{} {}", self.subject, self.body)
    }

    fn spec_sheet_present(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| contains_any(&a.name, SPEC_SHEET_NAME_KEYWORDS))
    }

    fn po_pdf_present(&self) -> bool {
        self.attachments.iter().any(|a| {
            a.content_type == PDF_CONTENT_TYPE && contains_any(&a.name, PO_ATTACHMENT_NAME_KEYWORDS)
        })
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Regex matching any keyword between word boundaries. Keywords are matched
/// literally, so `p.o.` needs a word character right after its last dot.
fn whole_word_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
}

/// Compiled pattern tables for classification.
pub struct Classifier {
    po_number_patterns: Vec<Regex>,
    po_keywords: Regex,
    quote_keywords: Regex,
    /// "po", optional space, 4–10 digits, in the body.
    body_po_number: Regex,
    /// 4+ consecutive digits in a filename.
    filename_digit_run: Regex,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            po_number_patterns: PO_NUMBER_PATTERNS
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
                .collect(),
            po_keywords: whole_word_regex(PO_KEYWORDS),
            quote_keywords: whole_word_regex(QUOTE_KEYWORDS),
            body_po_number: Regex::new(r"\bpo\s?[0-9]{4,10}\b").unwrap(),
            filename_digit_run: Regex::new(r"\d{4,}").unwrap(),
        }
    }

    /// Classify an email. Never fails.
    pub fn classify(
        &self,
        subject: &str,
        body: &str,
        has_attachments: bool,
        attachments: &[Attachment],
    ) -> Category {
        let input = ClassificationInput::new(subject, body, has_attachments, attachments);
        self.explain(&input).category
    }

    /// Run the decision procedure and report which rule fired.
    pub fn explain(&self, input: &ClassificationInput) -> Classification {
        let spec_sheet = input.spec_sheet_present();
        let po_pdf = input.po_pdf_present();
        let text = input.combined_text();

        if po_pdf {
            if spec_sheet {
                debug!("Spec sheet present, skipping strong PO checks");
            } else if let Some(rule) = self.strong_po_rule(input, &text) {
                return decided(Category::PurchaseOrders, rule);
            }
        }

        let score = self.po_signal_score(input);
        if score >= PO_SIGNAL_THRESHOLD {
            debug!(score, "PO signal score reached threshold");
            return decided(Category::PurchaseOrders, ClassificationRule::PoSignalScore);
        }

        if spec_sheet {
            return decided(Category::QuoteRequests, ClassificationRule::SpecSheet);
        }

        if self.quote_keywords.is_match(&text) {
            return decided(Category::QuoteRequests, ClassificationRule::QuoteKeyword);
        }

        decided(Category::NeedsAttention, ClassificationRule::Default)
    }

    fn strong_po_rule(&self, input: &ClassificationInput, text: &str) -> Option<ClassificationRule> {
        if self.po_number_patterns.iter().any(|r| r.is_match(text)) {
            return Some(ClassificationRule::PoNumber);
        }
        if self.po_keywords.is_match(text) {
            return Some(ClassificationRule::PoKeyword);
        }
        if FORWARD_PREFIXES.iter().any(|p| input.subject.starts_with(p)) {
            return Some(ClassificationRule::ForwardedPoPdf);
        }
        None
    }

    /// One point each for: a PDF filename, PO text in the body, and a
    /// filename containing "po" or 4+ digits.
    fn po_signal_score(&self, input: &ClassificationInput) -> u8 {
        let mut score = 0;

        if input.attachments.iter().any(|a| a.name.ends_with(".pdf")) {
            score += 1;
        }

        let body = &input.body;
        if body.contains("po#") || body.contains("purchase order") || self.body_po_number.is_match(body)
        {
            score += 1;
        }

        if input
            .attachments
            .iter()
            .any(|a| a.name.contains("po") || self.filename_digit_run.is_match(&a.name))
        {
            score += 1;
        }

        score
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn decided(category: Category, rule: ClassificationRule) -> Classification {
    debug!(category = %category, rule = rule.label(), "Email classified");
    Classification { category, rule }
}

static CLASSIFIER: LazyLock<Classifier> = LazyLock::new(Classifier::new);

/// Classify with the shared pattern tables.
pub fn classify(
    subject: &str,
    body: &str,
    has_attachments: bool,
    attachments: &[Attachment],
) -> Category {
    CLASSIFIER.classify(subject, body, has_attachments, attachments)
}

/// Classify a prepared input with the shared pattern tables.
pub fn explain(input: &ClassificationInput) -> Classification {
    CLASSIFIER.explain(input)
}
