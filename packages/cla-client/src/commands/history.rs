//! `cla history` (spec.md §4.6/§6). Flag-to-proxy-method mapping is
//! straightforward; the one subtlety, per spec.md's testable properties, is
//! that `HistoryNotAvailable` (no history at all) must render differently
//! from an empty filtered result (a valid, if uninteresting, answer).

use cla_ipcd::structures::HistoryList;

use crate::cli::HistoryArgs;
use crate::error::ClientError;
use crate::session::DaemonSession;

pub async fn run(args: HistoryArgs) -> Result<(), ClientError> {
    let session = DaemonSession::connect().await?;

    if args.clear {
        session.history.clear_history(&session.user_id).await?;
        println!("History cleared.");
        return Ok(());
    }

    let result = if args.first {
        session.history.get_first_conversation(&session.user_id).await
    } else if args.last {
        session.history.get_last_conversation(&session.user_id).await
    } else if let Some(filter) = &args.filter {
        session.history.get_filtered_conversation(&session.user_id, filter).await
    } else {
        // `--all`, or no flag at all: spec.md §4.6 default.
        session.history.get_history(&session.user_id).await
    };

    match result {
        Ok(history) => render(&history),
        Err(e) => match ClientError::from(e) {
            ClientError::HistoryNotAvailable(msg) => {
                println!("{msg}");
                Ok(())
            }
            other => Err(other),
        },
    }
}

fn render(history: &HistoryList) -> Result<(), ClientError> {
    if history.histories.is_empty() {
        println!("No conversations matched.");
        return Ok(());
    }
    for entry in &history.histories {
        println!("[{}]", entry.created_at);
        println!("> {}", entry.question);
        println!("{}", entry.response);
        println!();
    }
    Ok(())
}
