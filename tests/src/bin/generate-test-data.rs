use chatter_api::{Author, CommentId, CommentRecord, PostId, Time, UserId, Vote, VoteKind};
use chrono::Duration;
use rand::{seq::SliceRandom, Rng};

const NUM_USERS: usize = 8;
const NUM_COMMENTS: usize = 200;

const COMMENT_WORD_COUNT: usize = 25;
const MAX_VOTES: usize = 6;

// Share of comments generated with a broken parent pointer, per kind of breakage
const ORPHAN_RATE: f64 = 0.02;
const SELF_REFERENCE_RATE: f64 = 0.01;
const DUPLICATE_RATE: f64 = 0.02;
const DELETED_RATE: f64 = 0.05;

// Comments in a cycle of parent pointers, appended at the end
const CYCLE_LEN: usize = 3;

fn gen_user(rng: &mut impl Rng) -> (UserId, Author) {
    let i = rng.gen_range(0..NUM_USERS);
    let author = Author {
        username: format!("user{i}"),
        avatar: None,
        verified: i == 0,
    };
    (UserId(format!("user-{i}")), author)
}

fn gen_comment(
    rng: &mut impl Rng,
    id: CommentId,
    parent_id: Option<CommentId>,
    created_at: Time,
) -> CommentRecord {
    let (creator_id, author) = gen_user(rng);
    let text = lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORD_COUNT));
    let votes = (0..rng.gen_range(0..=MAX_VOTES))
        .map(|i| Vote {
            user_id: UserId(format!("voter-{i}")),
            kind: match rng.gen_bool(0.7) {
                true => VoteKind::Up,
                false => VoteKind::Down,
            },
        })
        .collect();
    CommentRecord {
        slug: id.0.clone(),
        id,
        parent_id,
        post_id: PostId(String::from("post-0")),
        creator_id,
        author,
        body: format!("<p>{text}</p>"),
        stripped_body: text,
        created_at,
        updated_at: created_at,
        deleted: rng.gen_bool(DELETED_RATE),
        votes,
    }
}

/// Prints a JSON dump of a thread, in the shape returned by the comment store, with a few
/// malformed parent pointers mixed in
fn main() -> Result<(), serde_json::Error> {
    let mut rng = rand::thread_rng();
    let start = Time::default() + Duration::days(19_000);

    let mut records: Vec<CommentRecord> = Vec::with_capacity(NUM_COMMENTS + CYCLE_LEN);
    for i in 0..NUM_COMMENTS {
        let id = CommentId(format!("c{i}"));
        let created_at = start + Duration::minutes(i as i64);
        let parent_id = if rng.gen_bool(ORPHAN_RATE) {
            Some(CommentId(format!("missing{i}")))
        } else if rng.gen_bool(SELF_REFERENCE_RATE) {
            Some(id.clone())
        } else if records.is_empty() || rng.gen_bool(0.3) {
            None
        } else {
            records.choose(&mut rng).map(|r| r.id.clone())
        };
        records.push(gen_comment(&mut rng, id, parent_id, created_at));

        if rng.gen_bool(DUPLICATE_RATE) {
            if let Some(mut dup) = records.choose(&mut rng).cloned() {
                dup.body = format!("{} (edited)", dup.body);
                records.push(dup);
            }
        }
    }

    for i in 0..CYCLE_LEN {
        let id = CommentId(format!("cycle{i}"));
        let parent = CommentId(format!("cycle{}", (i + 1) % CYCLE_LEN));
        let created_at = start + Duration::minutes((NUM_COMMENTS + i) as i64);
        records.push(gen_comment(&mut rng, id, Some(parent), created_at));
    }

    // The store answers in sort order, not in thread order
    records.shuffle(&mut rng);
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
