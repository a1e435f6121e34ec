use std::time::Duration;

/// Render an elapsed duration as "[Time used] HH h MM m SS.sss s", dropping leading zero units.
pub fn format_time_used(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) as f64 / 1000.0;

    match (hours, minutes) {
        (0, 0) => format!("[Time used] {:.3} s", seconds),
        (0, m) => format!("[Time used] {:02} m {:06.3} s", m, seconds),
        (h, m) => format!("[Time used] {:02} h {:02} m {:06.3} s", h, m, seconds),
    }
}
