use pdf_outliner::extract_layout;
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug-lines <pdf_path> [max_page | min-max]");
        std::process::exit(1);
    }

    // Pages are 0-based here, like in the JSON outputs
    let range = args.get(2).map(|s| s.as_str()).unwrap_or("0-2");
    let (min_page, max_page) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(0), b.parse().unwrap_or(2))
    } else {
        (0, range.parse().unwrap_or(2))
    };

    let layout = match extract_layout(&args[1]) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    for page in layout
        .pages
        .iter()
        .filter(|p| p.index >= min_page && p.index <= max_page)
    {
        let lines = page.lines();
        println!(
            "=== PAGE {} ({} lines, {:.0}x{:.0}) ===",
            page.index,
            lines.len(),
            page.width,
            page.height
        );
        for line in &lines {
            let bbox = line.bbox();
            println!(
                "  y0={:7.1} y1={:7.1} fs={:5.1} bold={:5} font={:<24} text={:?}",
                bbox.y0,
                bbox.y1,
                line.font_size(),
                line.is_bold(),
                line.font(),
                line.text()
            );
        }
        println!();
    }
}
