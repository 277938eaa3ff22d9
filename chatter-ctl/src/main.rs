use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context};
use chatter_client::{
    api::{CommentId, CommentRecord, PostId, SortKey, UserId},
    Config, LayoutMode, NormalizedComment, Projection, ThreadController, ViewState,
};
use chatter_mock_server::MockServer;

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON dump of the comment records of a thread, as returned by the store
    #[structopt(short, long, env = "CHATTER_FILE")]
    file: PathBuf,

    /// Post the thread hangs under, defaults to the post of the first record
    #[structopt(short, long, env = "CHATTER_POST")]
    post: Option<String>,

    /// Author of the post, whose comments get flagged as such
    #[structopt(long, env = "CHATTER_OP")]
    op: Option<String>,

    /// One of best, new, old or controversial
    #[structopt(short, long, env = "CHATTER_SORT", default_value = "best")]
    sort: SortKey,

    /// Only show the comments matching this term
    #[structopt(long, env = "CHATTER_SEARCH")]
    search: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the thread with nested replies
    Render,

    /// Print the thread with one level of replies per top-level comment
    Mobile,

    /// Report the structural problems of the dump, failing if there is any
    Check,
}

fn load(path: &PathBuf) -> anyhow::Result<Vec<CommentRecord>> {
    let data = std::fs::read(path).with_context(|| format!("reading {path:?}"))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing {path:?} as comment records"))
}

fn describe(c: &NormalizedComment) -> String {
    let op = if c.is_op { " (OP)" } else { "" };
    let text = match c.record.deleted {
        true => "[deleted]",
        false => c.record.stripped_body.lines().next().unwrap_or(""),
    };
    format!(
        "{}{op} [{:+}]: {text}",
        c.record.author.username,
        c.record.score(),
    )
}

fn by_id(roots: &[Arc<NormalizedComment>]) -> HashMap<&CommentId, &NormalizedComment> {
    let mut res = HashMap::new();
    let mut stack = roots.iter().collect::<Vec<_>>();
    while let Some(c) = stack.pop() {
        res.insert(c.id(), &**c);
        stack.extend(&c.replies);
    }
    res
}

fn render(c: &mut ThreadController) {
    // Terminal rows: the header line plus one per line of text
    let measure = |c: &NormalizedComment, _: usize| -> u32 {
        u32::try_from(c.record.stripped_body.lines().count().max(1)).unwrap_or(u32::MAX)
    };
    let (rows, stats) = c.compute_layout(&measure);
    tracing::debug!(measured = stats.measured, reused = stats.reused, "laid out thread");
    let comments = by_id(c.roots());
    for row in rows {
        let Some(comment) = comments.get(&row.id) else {
            continue;
        };
        let indent = "  ".repeat(row.depth);
        let marker = match (row.collapsed, row.connector) {
            (true, _) => "[+]",
            (false, Some(_)) => "[-]",
            (false, None) => "   ",
        };
        println!("{indent}{marker} {}", describe(comment));
    }
}

fn render_mobile(thread: &[(Arc<NormalizedComment>, Vec<chatter_client::FlatComment>)]) {
    for (root, replies) in thread {
        println!("{}", describe(root));
        for r in replies {
            println!(
                "    @{} <- {}",
                r.replying_to.record.author.username,
                describe(&r.comment),
            );
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();
    let records = load(&opt.file)?;
    let post = match opt.post {
        Some(p) => PostId(p),
        None => records
            .first()
            .map(|r| r.post_id.clone())
            .ok_or_else(|| anyhow!("no post given and {:?} holds no record", opt.file))?,
    };
    let op = opt.op.map(UserId).unwrap_or_else(|| UserId(String::new()));
    let layout_mode = match opt.cmd {
        Command::Mobile => LayoutMode::Mobile,
        Command::Render | Command::Check => LayoutMode::Desktop,
    };

    let store = MockServer::from_records(records);
    let mut thread = ThreadController::new(
        post,
        op,
        Config {
            default_sort: opt.sort,
            layout_mode,
            ..Config::default()
        },
    );
    let req = match &opt.search {
        Some(term) => thread.commit_search(term),
        None => thread.refresh(),
    };
    let resp = req.run(&store).await;
    let state = match thread.apply(resp).context("loading thread")? {
        chatter_client::Applied::Current(state) => state,
        chatter_client::Applied::Stale => return Err(anyhow!("thread load got superseded")),
    };

    if let Command::Check = opt.cmd {
        let a = thread.anomalies();
        println!("orphans: {:?}", a.orphans);
        println!("duplicates: {:?}", a.duplicates);
        println!("self references: {:?}", a.self_references);
        println!("cycles broken: {:?}", a.cycles_broken);
        if !a.is_empty() {
            return Err(anyhow!("thread has structural problems"));
        }
        return Ok(());
    }

    match state {
        ViewState::LoadedEmpty => println!("No comments yet"),
        ViewState::NoMatch => println!("No comment matches {:?}", opt.search.unwrap_or_default()),
        _ => match thread.layout_mode() {
            LayoutMode::Desktop => render(&mut thread),
            LayoutMode::Mobile => {
                if let Projection::Flat(t) = thread.projection() {
                    render_mobile(t);
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chatter_client::normalize;

    use super::*;

    #[test]
    fn index_covers_every_nested_comment() {
        let roots = normalize(
            vec![
                CommentRecord::stub("1", None),
                CommentRecord::stub("2", Some("1")),
                CommentRecord::stub("3", Some("2")),
                CommentRecord::stub("4", None),
            ],
            &UserId::stub(),
        );
        let index = by_id(&roots);
        assert_eq!(index.len(), 4);
        assert_eq!(index[&CommentId::from("3")].id(), &CommentId::from("3"));
        assert!(!index.contains_key(&CommentId::from("5")));
    }
}
