use chrono::{Duration, Utc};
use commentbox_api::{Comment, CommentId};
use rand::{seq::SliceRandom, Rng};

const NUM_COMMENTS: usize = 40;
const MIN_WORDS: usize = 3;
const MAX_WORDS: usize = 30;

// spread creation dates over roughly a year, so every relative-time phrase shows up
const MAX_AGE_MINUTES: i64 = 60 * 24 * 400;

const AUTHORS: &[&str] = &["Bryan", "You", "Ann", "Bo", "Cy"];

fn gen_text(rng: &mut impl Rng, words: &[&str]) -> String {
    let len = rng.gen_range(MIN_WORDS..=MAX_WORDS);
    let start = rng.gen_range(0..words.len() - len);
    let text = &words[start..start + len];
    // sprinkle some markdown
    format!("__{}__ {}", text[0], text[1..].join(" "))
}

fn main() {
    let mut rng = rand::thread_rng();
    let corpus = lipsum::lipsum_words(MAX_WORDS * 20);
    let words = corpus.split_whitespace().collect::<Vec<_>>();

    let now = Utc::now();
    let mut comments = (0..NUM_COMMENTS)
        .map(|i| {
            let created_at = now - Duration::minutes(rng.gen_range(0..MAX_AGE_MINUTES));
            let edited_after = Duration::minutes(rng.gen_range(0..60));
            Comment {
                id: CommentId(format!("{:024x}", i + 1)),
                author: String::from(*AUTHORS.choose(&mut rng).expect("no authors")),
                text: gen_text(&mut rng, &words),
                created_at,
                updated_at: (created_at + edited_after).min(now),
            }
        })
        .collect::<Vec<_>>();
    comments.sort_by_key(|c| c.created_at);

    println!(
        "{}",
        serde_json::to_string_pretty(&comments).expect("serializing comments")
    );
}
