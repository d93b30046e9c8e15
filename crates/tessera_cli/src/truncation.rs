//! `tessera truncation`: the error budget of a truncated product.

use tessera_bitheap::{compute_truncation_params, TruncationParams};

use crate::{GlobalArgs, ReportFormat};

/// Prints the truncation parameters for `w_out` bits out of `w_full`.
pub fn run(
    w_full: u32,
    w_out: u32,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    if w_full == 0 || w_full > 120 {
        return Err(format!("product width must be in 1..=120, got {w_full}").into());
    }
    let t = compute_truncation_params(w_full, w_out);
    match global.format {
        ReportFormat::Text => print!("{}", describe(&t)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&t)?),
    }
    Ok(0)
}

fn describe(t: &TruncationParams) -> String {
    if t.is_exact() {
        return "full precision: nothing truncated\n".to_string();
    }
    format!(
        "truncated bits   {}\nguard bits       {}\nkeep bits        {}\nboundary column  {}\nerror budget     {}\ncenter constant  {}\nheap constant    {}\n",
        t.truncated_bits,
        t.guard_bits,
        t.keep_bits,
        t.boundary_column(),
        t.error_budget,
        t.center_constant,
        t.heap_constant()
    )
}
