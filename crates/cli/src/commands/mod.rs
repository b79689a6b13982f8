pub mod ask;
pub mod chat;
pub mod status;
pub mod tools;

use genaiops_agent::RunResult;

/// Print an answer and its run metadata.
pub fn print_result(result: &RunResult, guard_label: &str) {
    println!();
    for line in result.answer.lines() {
        println!("  {line}");
    }
    println!();
    println!("  ─────────────────────────────────────────");
    println!("  Tool calls:  {}", result.tool_calls);
    println!("  Iterations:  {}", result.iterations);
    println!("  Stopped:     {}", result.stop_reason);
    println!("  Guard:       {guard_label}");
    if let Some(error) = &result.error {
        println!("  Error:       {error}");
    }
    println!();
}
