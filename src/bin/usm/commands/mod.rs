mod compose;
mod graft;
mod replicate;
mod run;
mod shared;
mod termset;
mod wrap;

use anyhow::Result;

use crate::cli::Command;
use crate::display::Context;

pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Compose(args) => compose::run_compose(args, ctx),
        Command::Wrap(args) => wrap::run_wrap(args, ctx),
        Command::Replicate(args) => replicate::run_replicate(args, ctx),
        Command::Termset(args) => termset::run_termset(args, ctx),
        Command::Graft(args) => graft::run_graft(args, ctx),
        Command::Run(args) => run::run_pipeline(args, ctx),
    }
}
