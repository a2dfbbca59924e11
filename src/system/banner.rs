use std::io::IsTerminal;

use crossterm::style::{Color, Stylize};

const BANNER_LINES: [&str; 6] = [
    "███████╗██╗███╗   ██╗██╗  ██╗██╗  ██╗ ██████╗ ██╗     ███████╗",
    "██╔════╝██║████╗  ██║██║ ██╔╝██║  ██║██╔═══██╗██║     ██╔════╝",
    "███████╗██║██╔██╗ ██║█████╔╝ ███████║██║   ██║██║     █████╗  ",
    "╚════██║██║██║╚██╗██║██╔═██╗ ██╔══██║██║   ██║██║     ██╔══╝  ",
    "███████║██║██║ ╚████║██║  ██╗██║  ██║╚██████╔╝███████╗███████╗",
    "╚══════╝╚═╝╚═╝  ╚═══╝╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚══════╝",
];

const COLOR_TOP: (u8, u8, u8) = (0x2e, 0xd5, 0xa0);
const COLOR_BOTTOM: (u8, u8, u8) = (0x1b, 0x4f, 0xd8);
const SUBTITLE_RGB: (u8, u8, u8) = (0x2e, 0xd5, 0xa0);

/// Prints the wordmark followed by `details` (run parameters).
///
/// Color is only used when stdout is a terminal.
pub(crate) fn print_cli_banner(no_color: bool, details: &str) {
    let use_color = !no_color && std::io::stdout().is_terminal();
    let denom = BANNER_LINES.len().saturating_sub(1);
    for (idx, line) in BANNER_LINES.iter().enumerate() {
        if use_color {
            let (r, g, b) = gradient_rgb(COLOR_TOP, COLOR_BOTTOM, idx, denom);
            println!("{}", line.with(Color::Rgb { r, g, b }));
        } else {
            println!("{line}");
        }
    }

    let description = format!("sinkhole v{} | {}", env!("CARGO_PKG_VERSION"), details);
    if use_color {
        let (r, g, b) = SUBTITLE_RGB;
        println!("{}", description.with(Color::Rgb { r, g, b }));
    } else {
        println!("{description}");
    }
    println!();
}

fn gradient_rgb(start: (u8, u8, u8), end: (u8, u8, u8), idx: usize, denom: usize) -> (u8, u8, u8) {
    let denom = i32::try_from(denom.max(1)).unwrap_or(i32::MAX);
    let idx = i32::try_from(idx).unwrap_or(i32::MAX).min(denom);
    let lerp = |a: u8, b: u8| -> u8 {
        let a = i32::from(a);
        let b = i32::from(b);
        let value = b
            .checked_sub(a)
            .and_then(|delta| delta.checked_mul(idx))
            .and_then(|scaled| scaled.checked_div(denom))
            .and_then(|step| a.checked_add(step))
            .unwrap_or(a);
        u8::try_from(value.clamp(0, 255)).unwrap_or(0)
    };
    (
        lerp(start.0, end.0),
        lerp(start.1, end.1),
        lerp(start.2, end.2),
    )
}
