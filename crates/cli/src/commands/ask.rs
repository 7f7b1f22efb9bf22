//! `fitcoach ask` — Single question mode.

use fitcoach_core::message::ThreadId;
use futures::StreamExt;
use std::io::Write;

use super::{StreamPrinter, TurnFlags, load_coach, render_result};

pub async fn run(message: String, flags: TurnFlags, stream: bool) -> anyhow::Result<()> {
    let coach = load_coach()?;
    let options = flags.options(coach.config());
    let thread = ThreadId::new();

    if stream {
        let mut printer = StreamPrinter::new(options.language);
        let mut snapshots = coach.ask_streaming(&thread, &message, &options).await?;
        let mut stdout = std::io::stdout();
        while let Some(snapshot) = snapshots.next().await {
            if let Some(text) = printer.update(&snapshot) {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
        }
        return Ok(());
    }

    let result = coach.ask(&thread, &message, &options).await?;
    println!("{}", render_result(&result, options.reasoning));
    if result.error.is_some() && result.answer_text.is_empty() {
        anyhow::bail!("The coach could not answer this question");
    }
    Ok(())
}
