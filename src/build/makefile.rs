//! Makefile emitter for build plans.
//!
//! Each target becomes one rule hanging off the umbrella rule, so
//! `make -j N all` builds up to N keyboards at once. A rule:
//!
//! 1. removes a stale failure marker,
//! 2. runs the keyboard's sub-make with output appended to its log,
//!    copying the log to the failure marker if the sub-make fails,
//! 3. greps the log for outcome markers and prints one status line,
//! 4. removes the log.

use crate::build::{BuildPlan, BuildRule, Outcome};
use std::fmt::Write;
use std::path::Path;

/// First line of every generated plan.
pub const HEADER: &str = "# Generated by multibuild. Changes are overwritten on every run.";

/// Render a plan as a Makefile.
pub fn render(plan: &BuildPlan) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n\n");

    for rule in plan.rules() {
        render_rule(&mut out, plan, rule);
    }
    out
}

fn render_rule(out: &mut String, plan: &BuildPlan, rule: &BuildRule) {
    let log = quote_path(&rule.log);
    let failed = quote_path(&rule.failure_marker);

    // Writing into a String cannot fail
    let _ = writeln!(out, "{}: {}", plan.root(), rule.name);
    let _ = writeln!(out, "{}:", rule.name);
    let _ = writeln!(out, "\t@rm -f {} || true", failed);
    let _ = writeln!(out, "\t+@$(MAKE) {} \\", sub_make_args(rule));
    let _ = writeln!(out, "\t\t>>{} 2>&1 \\", log);
    let _ = writeln!(out, "\t\t|| cp {} {}", log, failed);
    let _ = writeln!(out, "\t@{}", classify_command(rule, &log, plan.color()));
    let _ = writeln!(out, "\t@rm -f {} || true", log);
    out.push('\n');
}

/// Arguments after `$(MAKE)` for a rule's build step.
fn sub_make_args(rule: &BuildRule) -> String {
    let mut args = format!(
        "-C {} -f {}",
        quote_path(&rule.build.directory),
        quote_path(&rule.build.makefile)
    );
    for (key, value) in &rule.build.variables {
        if value.is_empty() {
            let _ = write!(args, " {}=", key);
        } else {
            let _ = write!(args, " {}={}", key, quote(value));
        }
    }
    args
}

/// Shell chain that prints the status line of the first matching outcome.
fn classify_command(rule: &BuildRule, log: &str, color: bool) -> String {
    let name = quote(&rule.display_name);
    let steps: Vec<String> = Outcome::PRECEDENCE
        .iter()
        .map(|outcome| {
            let print = format!("printf \"{}\" {}", outcome.status_format(color), name);
            match outcome.marker() {
                Some(marker) => format!(
                    "{{ grep '{}' {} >/dev/null 2>&1 && {} ; }}",
                    grep_pattern(marker),
                    log,
                    print
                ),
                None => print,
            }
        })
        .collect();
    steps.join(" \\\n\t\t|| ")
}

/// Basic regular expression matching `literal` exactly.
pub fn grep_pattern(literal: &str) -> String {
    let mut pattern = String::with_capacity(literal.len() + 4);
    for c in literal.chars() {
        if matches!(c, '[' | ']' | '.' | '*' | '^' | '$' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

/// Double-quote a word for a recipe line.
///
/// Escapes what the shell would interpret inside double quotes and doubles
/// `$` so make passes it through.
pub fn quote(word: &str) -> String {
    let mut quoted = String::with_capacity(word.len() + 2);
    quoted.push('"');
    for c in word.chars() {
        match c {
            '"' | '\\' | '`' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '$' => quoted.push_str("\\$$"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

// Plans are only generated for UTF-8 paths, so the conversion is lossless.
fn quote_path(path: &Path) -> String {
    quote(&path.to_string_lossy())
}
