//! `cla status` (spec.md §6), grounded on
//! `original_source/command_line_assistant/commands/status.py`'s
//! `_check_user_channel_permission` (probe `IsAllowed` on every interface)
//! and its factory default ("neither `--daemon` nor `--subscription` given
//! means run both"). Subscription-manager integration is out of scope (spec.md
//! Non-goals), so `--subscription` only reports that the check was skipped
//! rather than reaching for RHSM's D-Bus service.

use crate::cli::StatusArgs;
use crate::error::ClientError;
use crate::session::DaemonSession;

pub async fn run(args: StatusArgs) -> Result<(), ClientError> {
    let run_all = args.all || (!args.daemon && !args.subscription);

    println!("Command Line Assistant Status Check");
    println!("====================================");

    if run_all || args.daemon {
        check_daemon_status().await;
    }
    if run_all || args.subscription {
        println!("- subscription status: not checked (subscription-manager integration is out of scope)");
    }

    Ok(())
}

async fn check_daemon_status() {
    match DaemonSession::connect().await {
        Ok(session) => {
            let checks: [(&str, zbus::Result<bool>); 2] = [
                ("Chat", session.chat.is_allowed().await),
                ("History", session.history.is_allowed().await),
            ];
            for (name, result) in checks {
                match result {
                    Ok(_) => println!("[ok] user has permission to access channel {name}"),
                    Err(e) => println!("[fail] could not reach channel {name}: {e}"),
                }
            }
        }
        Err(e) => {
            println!("[fail] daemon is not reachable: {e}");
            println!("Recommendation: check `systemctl status clad.service`");
        }
    }
}
