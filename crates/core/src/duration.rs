//! Human-readable duration formatting.
//!
//! Serializes a duration as a magnitude plus unit suffix: sub-second values
//! use `ns`/`µs`/`ms`, larger values compose `h`/`m`/`s` with trailing zero
//! fraction digits trimmed. Examples: `0s`, `500ms`, `1m0s`, `1h30m0.5s`.

use chrono::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Format a duration in the `"1m0s"` style. The zero duration is `"0s"`.
pub fn format_duration(d: Duration) -> String {
    let Some(ns) = d.num_nanoseconds() else {
        // Durations too large for an i64 nanosecond count; whole-second
        // rendering is exact enough at that magnitude.
        let secs = d.num_seconds();
        let sign = if secs < 0 { "-" } else { "" };
        let s = secs.unsigned_abs();
        return format!("{sign}{}h{}m{}s", s / 3600, (s % 3600) / 60, s % 60);
    };
    if ns == 0 {
        return "0s".to_string();
    }

    let negative = ns < 0;
    let u = ns.unsigned_abs();
    let mut out = String::new();

    if u < NANOS_PER_SEC {
        let (scale, digits, unit) = if u < 1_000 {
            (1, 0, "ns")
        } else if u < 1_000_000 {
            (1_000, 3, "µs")
        } else {
            (1_000_000, 6, "ms")
        };
        push_value(&mut out, u / scale, u % scale, digits);
        out.push_str(unit);
    } else {
        let total_secs = u / NANOS_PER_SEC;
        let frac_ns = u % NANOS_PER_SEC;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;

        if hours > 0 {
            out.push_str(&hours.to_string());
            out.push('h');
        }
        if hours > 0 || minutes > 0 {
            out.push_str(&minutes.to_string());
            out.push('m');
        }
        push_value(&mut out, seconds, frac_ns, 9);
        out.push('s');
    }

    if negative {
        format!("-{out}")
    } else {
        out
    }
}

/// Append `whole` plus an optional fractional part with trailing zeros
/// trimmed. `digits` is the number of decimal places `frac` represents.
fn push_value(out: &mut String, whole: u64, frac: u64, digits: usize) {
    out.push_str(&whole.to_string());
    if frac > 0 {
        let mut fraction = format!("{frac:0>digits$}");
        while fraction.ends_with('0') {
            fraction.pop();
        }
        out.push('.');
        out.push_str(&fraction);
    }
}
