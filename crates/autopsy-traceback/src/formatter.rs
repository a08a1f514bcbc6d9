//! Traceback rendering and filtering

use crate::{
    context,
    exclusion::Exclusions,
    fault::Fault,
    filter,
    frame::{Frame, Local},
    source::LineCache,
    Error, Result,
};
use std::sync::{Arc, OnceLock};

/// Identical consecutive frames printed before the rest are collapsed
const RECURSION_CUTOFF: usize = 3;

const TRACEBACK_HEADER: &str = "Traceback (most recent call last):\n";

/// Reusable traceback formatter with its own exclusion lists and line cache
#[derive(Debug)]
pub struct TracebackFormatter {
    exclusions: Exclusions,
    lines: Option<LineCache>,
}

impl TracebackFormatter {
    pub fn new(exclusions: Exclusions) -> Self {
        Self {
            exclusions,
            lines: Some(LineCache::new()),
        }
    }

    /// Only print source text that frames carry themselves
    pub fn without_source_lookup(mut self) -> Self {
        self.lines = None;
        self
    }

    pub fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }

    /// Render `fault` and its prior faults, filtered by this formatter's lists.
    ///
    /// Never empty: when the filters drop every line, the fault's own
    /// `<kind>: <message>` line is returned unfiltered.
    pub fn format(&self, fault: &Fault) -> String {
        render(fault, &self.exclusions, self.lines.as_ref())
    }

    /// Render the fault currently being handled
    pub fn format_current(&self) -> Result<String> {
        self.format_or_current(None)
    }

    /// Render `fault`, or the current fault when `None` is given
    pub fn format_or_current(&self, fault: Option<&Fault>) -> Result<String> {
        with_fault(fault, |fault| self.format(fault))
    }

    /// Traceback framed for embedding in a log message
    pub fn describe(&self, fault: Option<&Fault>) -> Result<String> {
        with_fault(fault, |fault| frame_report(fault, &self.format(fault)))
    }
}

impl Default for TracebackFormatter {
    fn default() -> Self {
        Self::new(Exclusions::default())
    }
}

/// Render `fault` (or the current fault when `None`) with the given lists.
///
/// Fails with [`Error::InvalidState`] only when there is nothing to format.
pub fn format_traceback(fault: Option<&Fault>, exclusions: &Exclusions) -> Result<String> {
    with_fault(fault, |fault| render(fault, exclusions, Some(shared_lines())))
}

/// [`format_traceback`] with the default lists, framed for a log message:
/// `"\nDetailed error report for Kind(\"message\"): \n<traceback>\n"`
pub fn describe(fault: Option<&Fault>) -> Result<String> {
    with_fault(fault, |fault| {
        let traceback = render(fault, &Exclusions::default(), Some(shared_lines()));
        frame_report(fault, &traceback)
    })
}

fn shared_lines() -> &'static LineCache {
    static LINES: OnceLock<LineCache> = OnceLock::new();
    LINES.get_or_init(LineCache::new)
}

fn with_fault<T>(fault: Option<&Fault>, f: impl FnOnce(&Fault) -> T) -> Result<T> {
    if let Some(fault) = fault {
        return Ok(f(fault));
    }

    let current: Arc<Fault> = context::current().ok_or_else(|| Error::InvalidState {
        message: "no fault given and none is currently being handled".to_string(),
    })?;
    Ok(f(&current))
}

fn frame_report(fault: &Fault, traceback: &str) -> String {
    format!("\nDetailed error report for {}: \n{}\n", fault.repr(), traceback)
}

fn render(fault: &Fault, exclusions: &Exclusions, lines: Option<&LineCache>) -> String {
    let blocks = render_blocks(fault, lines);
    let text: String = filter::blocks(blocks, &exclusions.traces).collect();
    let output = filter::lines(&text, &exclusions.locals)
        .collect::<Vec<_>>()
        .join("\n");

    if output.is_empty() {
        return fault.to_string();
    }
    output
}

/// Coarse units for the first filter pass: one per frame, header, banner or
/// fault line
fn render_blocks(fault: &Fault, lines: Option<&LineCache>) -> Vec<String> {
    let mut blocks = Vec::new();

    for (relation, fault) in fault.chain() {
        if let Some(relation) = relation {
            blocks.push(relation.banner().to_string());
        }
        render_stack(fault, lines, &mut blocks);
        blocks.push(format!("{}\n", fault));
    }

    blocks
}

fn render_stack(fault: &Fault, lines: Option<&LineCache>, blocks: &mut Vec<String>) {
    if fault.frames().is_empty() {
        return;
    }
    blocks.push(TRACEBACK_HEADER.to_string());

    let mut previous: Option<&Frame> = None;
    let mut count = 0;

    // Outermost first, most recent call last
    for frame in fault.frames().iter().rev() {
        let repeated = matches!(previous, Some(prev) if prev.same_site(frame));
        if !repeated {
            push_repeat_note(count, blocks);
            count = 0;
        }
        previous = Some(frame);
        count += 1;

        if count > RECURSION_CUTOFF {
            continue;
        }
        blocks.push(render_frame(frame, lines));
    }
    push_repeat_note(count, blocks);
}

fn push_repeat_note(count: usize, blocks: &mut Vec<String>) {
    if count > RECURSION_CUTOFF {
        let more = count - RECURSION_CUTOFF;
        let plural = if more > 1 { "s" } else { "" };
        blocks.push(format!(
            "  [Previous line repeated {} more time{}]\n",
            more, plural
        ));
    }
}

fn render_frame(frame: &Frame, lines: Option<&LineCache>) -> String {
    let location = frame.location();
    let mut block = format!(
        "  File \"{}\", line {}, in {}\n",
        location.file, location.line, location.function
    );

    let source = match frame.source() {
        Some(source) => Some(source.trim().to_string()),
        None => lines.and_then(|cache| cache.line(&location.file, location.line)),
    };
    if let Some(source) = source.filter(|s| !s.is_empty()) {
        block.push_str(&format!("    {}\n", source));
    }

    let mut locals: Vec<&Local> = frame.locals().iter().collect();
    locals.sort_by(|a, b| a.name.cmp(&b.name));
    for local in locals {
        block.push_str(&format!("    {} = {}\n", local.name, local.value));
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context, exclusion::ExclusionList, frame::Frame};

    fn plain() -> TracebackFormatter {
        TracebackFormatter::new(Exclusions::none()).without_source_lookup()
    }

    fn vendor_fault() -> Fault {
        Fault::new("ValueError", "bad row")
            .with_frame(
                Frame::new("/vendor/lib.rs", 10, "vendor::parse")
                    .with_source("parse(row)?")
                    .with_local("row", &"a,b"),
            )
            .with_frame(Frame::new("/app/main.rs", 5, "app::main").with_local("path", &"in.csv"))
    }

    #[test]
    fn test_full_layout() {
        let output = plain().format(&vendor_fault());
        let expected = [
            "Traceback (most recent call last):",
            "  File \"/app/main.rs\", line 5, in app::main",
            "    path = \"in.csv\"",
            "  File \"/vendor/lib.rs\", line 10, in vendor::parse",
            "    parse(row)?",
            "    row = \"a,b\"",
            "ValueError: bad row",
        ]
        .join("\n");
        assert_eq!(output, expected);
    }

    #[test]
    fn test_trace_exclusion_drops_whole_frame() {
        let exclusions = Exclusions::new(ExclusionList::new().with("/vendor/"), ExclusionList::new());
        let output = TracebackFormatter::new(exclusions)
            .without_source_lookup()
            .format(&vendor_fault());

        assert!(output.contains("/app/main.rs"));
        assert!(!output.contains("/vendor/"));
        assert!(!output.contains("row = "));
        assert!(!output.contains("parse(row)?"));
    }

    #[test]
    fn test_local_exclusion_drops_single_line() {
        let fault = Fault::new("KeyError", "missing").with_frame(
            Frame::new("/app/main.rs", 5, "app::main")
                .with_local("__secret", &"hunter2")
                .with_local("public_value", &7),
        );
        let exclusions = Exclusions::new(ExclusionList::new(), ExclusionList::new().with("__"));
        let output = TracebackFormatter::new(exclusions)
            .without_source_lookup()
            .format(&fault);

        assert!(!output.contains("__secret"));
        assert!(output.contains("    public_value = 7"));
        assert!(output.contains("/app/main.rs"));
    }

    #[test]
    fn test_locals_sorted_by_name() {
        let fault = Fault::new("E", "m").with_frame(
            Frame::new("a.rs", 1, "f")
                .with_local("zeta", &1)
                .with_local("alpha", &2),
        );
        let output = plain().format(&fault);
        let alpha = output.find("alpha").unwrap();
        let zeta = output.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_fault_without_frames() {
        let output = plain().format(&Fault::new("Interrupted", "shutdown requested"));
        assert_eq!(output, "Interrupted: shutdown requested");
        assert!(!output.contains("Traceback"));
    }

    #[test]
    fn test_filtered_away_fault_line_restored() {
        let fault = Fault::new("AttributeError", "object has no attribute __len__");
        let output = TracebackFormatter::default()
            .without_source_lookup()
            .format(&fault);
        assert_eq!(output, "AttributeError: object has no attribute __len__");
    }

    #[test]
    fn test_chain_rendered_oldest_first() {
        let root = Fault::new("IoError", "disk full").with_frame(Frame::new("store.rs", 3, "store::write"));
        let top = Fault::new("SaveError", "save aborted")
            .with_frame(Frame::new("api.rs", 9, "api::save"))
            .caused_by(root);

        let output = plain().format(&top);
        let io = output.find("IoError: disk full").unwrap();
        let banner = output
            .find("The above error was the direct cause of the following error:")
            .unwrap();
        let save = output.find("SaveError: save aborted").unwrap();
        assert!(io < banner && banner < save);
        assert_eq!(output.matches("Traceback (most recent call last):").count(), 2);
    }

    #[test]
    fn test_during_handling_banner() {
        let top = Fault::new("RetryError", "gave up").during(Fault::new("Timeout", "30s"));
        let output = plain().format(&top);
        assert!(output.contains("During handling of the above error, another error occurred:"));
    }

    #[test]
    fn test_recursion_collapsed() {
        let mut fault = Fault::new("StackOverflow", "too deep");
        for _ in 0..10 {
            fault.push_frame(Frame::new("tree.rs", 42, "tree::walk"));
        }
        fault.push_frame(Frame::new("main.rs", 1, "main"));

        let output = plain().format(&fault);
        assert_eq!(output.matches("in tree::walk").count(), 3);
        assert!(output.contains("  [Previous line repeated 7 more times]"));
    }

    #[test]
    fn test_single_extra_repeat_is_singular() {
        let mut fault = Fault::new("E", "m");
        for _ in 0..4 {
            fault.push_frame(Frame::new("tree.rs", 42, "tree::walk"));
        }
        let output = plain().format(&fault);
        assert!(output.contains("[Previous line repeated 1 more time]"));
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let formatter = TracebackFormatter::default();
        let fault = vendor_fault();
        assert_eq!(formatter.format(&fault), formatter.format(&fault));
    }

    #[test]
    fn test_invalid_state_without_fault() {
        let err = format_traceback(None, &Exclusions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert!(plain().format_current().is_err());
    }

    #[test]
    fn test_current_fault_used_when_absent() {
        let fault = Fault::new("Conflict", "version mismatch");
        let output = context::handling(fault, || plain().format_current().unwrap());
        assert_eq!(output, "Conflict: version mismatch");
    }

    #[test]
    fn test_describe_wraps_repr() {
        let fault = Fault::new("ValueError", "bad");
        let report = describe(Some(&fault)).unwrap();
        assert_eq!(
            report,
            "\nDetailed error report for ValueError(\"bad\"): \nValueError: bad\n"
        );
    }
}
