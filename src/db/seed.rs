//! First-open seed: the settings row and an optional starter book.

use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::models::{now_timestamp, Language, Settings};

pub const STARTER_BOOK_NAME: &str = "My First Book";
pub const STARTER_BOOK_COLOR: &str = "blue";

/// Sample vocabulary for the starter book, as (term, meaning).
pub const STARTER_WORDS: &[(&str, &str)] = &[
    (
        "Ambiguous",
        "(unclear, vague) having more than one possible meaning or interpretation",
    ),
    (
        "Scrutinize",
        "(examine, inspect) to look at or examine something very carefully",
    ),
    (
        "Contemplate",
        "(ponder, consider) to think about something carefully and thoroughly",
    ),
    (
        "Deteriorate",
        "(decline, worsen) to become worse in quality, condition, or value",
    ),
    (
        "Elaborate",
        "(detailed, complex) involving many carefully arranged parts or details",
    ),
    (
        "Fluctuate",
        "(vary, oscillate) to change continually and irregularly",
    ),
    (
        "Implement",
        "(execute, carry out) to put a plan or decision into effect",
    ),
    (
        "Inevitable",
        "(unavoidable, certain) certain to happen and impossible to prevent",
    ),
    (
        "Jeopardize",
        "(endanger, threaten) to put something at risk of being harmed or lost",
    ),
    (
        "Legitimate",
        "(valid, lawful) conforming to the law or rules; acceptable",
    ),
    (
        "Manipulate",
        "(control, influence) to handle or control something skillfully",
    ),
    (
        "Negligible",
        "(insignificant, trivial) so small as to be not worth considering",
    ),
    (
        "Obstinate",
        "(stubborn, persistent) refusing to change one's opinion or chosen course",
    ),
    (
        "Precarious",
        "(unstable, risky) not securely held and likely to fall or collapse",
    ),
    (
        "Quintessential",
        "(typical, perfect) representing the most perfect example of something",
    ),
    (
        "Resilient",
        "(flexible, adaptable) able to recover quickly from difficult conditions",
    ),
    (
        "Substantial",
        "(significant, considerable) of considerable importance, size, or worth",
    ),
    (
        "Tangible",
        "(concrete, physical) perceptible by touch; clear and definite",
    ),
    (
        "Ubiquitous",
        "(everywhere, omnipresent) present or existing everywhere at the same time",
    ),
    (
        "Versatile",
        "(adaptable, flexible) able to adapt to many different functions or activities",
    ),
    (
        "Withdrawal",
        "(removal, retreat) the action of taking something away or back",
    ),
    (
        "Xenophobia",
        "(prejudice, bigotry) dislike or prejudice against people from other countries",
    ),
    (
        "Yield",
        "(surrender, produce) to give way under pressure or produce as a result",
    ),
    (
        "Zealous",
        "(passionate, fervent) showing great energy and passion for something",
    ),
    (
        "Acknowledge",
        "(recognize, admit) to accept or admit the existence or truth of something",
    ),
    (
        "Bias",
        "(prejudice, favoritism) inclination or prejudice for or against something",
    ),
    (
        "Coherent",
        "(logical, consistent) logical and consistent; forming a unified whole",
    ),
    (
        "Diverse",
        "(varied, different) showing a great deal of variety; very different",
    ),
    (
        "Exclude",
        "(omit, bar) to deny someone access to or bar from something",
    ),
    (
        "Fundamental",
        "(basic, essential) forming a necessary base or core; central",
    ),
    (
        "Generate",
        "(produce, create) to cause something to arise or come about",
    ),
    (
        "Hypothesis",
        "(theory, assumption) a supposition made as a starting point for investigation",
    ),
    (
        "Implicit",
        "(implied, understood) suggested though not directly expressed",
    ),
    (
        "Justify",
        "(defend, validate) to show or prove to be right or reasonable",
    ),
    (
        "Maintain",
        "(preserve, continue) to cause something to continue in the same state",
    ),
    (
        "Notion",
        "(idea, concept) a conception or belief about something",
    ),
    (
        "Objective",
        "(goal, impartial) a thing aimed at or sought; not influenced by feelings",
    ),
    (
        "Perception",
        "(awareness, understanding) the ability to see, hear, or become aware of something",
    ),
    (
        "Radical",
        "(extreme, fundamental) relating to the most important parts of something",
    ),
    (
        "Sustain",
        "(maintain, support) to strengthen or support physically or mentally",
    ),
];

/// Seed the store unless it has been seeded before. Returns whether it ran.
pub async fn seed_if_needed(pool: &SqlitePool, with_words: bool) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let seeded: i64 = sqlx::query("SELECT seeded FROM meta WHERE id = 1")
        .fetch_one(&mut *tx)
        .await?
        .get("seeded");
    if seeded != 0 {
        return Ok(false);
    }

    // Stores created before the flag existed already hold user data.
    let has_settings = sqlx::query("SELECT 1 FROM settings WHERE id = 1")
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if has_settings {
        sqlx::query("UPDATE meta SET seeded = 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        return Ok(false);
    }

    seed(&mut *tx, with_words).await?;
    tx.commit().await?;
    Ok(true)
}

/// Insert the default settings row and, optionally, the starter book.
///
/// Expects empty `settings`, `books` and `words` tables.
pub async fn seed(conn: &mut SqliteConnection, with_words: bool) -> Result<(), sqlx::Error> {
    let now = now_timestamp();
    let defaults = Settings::defaults(now.clone());

    sqlx::query(
        "INSERT OR IGNORE INTO settings (id, per_page, layout, hide_meanings, selected_book_id, updated_at) VALUES (1, ?, ?, ?, NULL, ?)",
    )
    .bind(defaults.per_page)
    .bind(defaults.layout.as_str())
    .bind(defaults.hide_meanings as i32)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    if with_words && !STARTER_WORDS.is_empty() {
        let book_id = sqlx::query(
            "INSERT INTO books (name, color, type, value, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(STARTER_BOOK_NAME)
        .bind(STARTER_BOOK_COLOR)
        .bind(Language::En.as_str())
        .bind(Language::En.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        for (term, meaning) in STARTER_WORDS {
            sqlx::query(
                "INSERT INTO words (term, meaning, learned, book_id, created_at, updated_at) VALUES (?, ?, 0, ?, ?, ?)",
            )
            .bind(*term)
            .bind(*meaning)
            .bind(book_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await?;
        }

        tracing::info!(
            book_id,
            words = STARTER_WORDS.len(),
            "Seeded starter book"
        );
    }

    sqlx::query("UPDATE meta SET seeded = 1 WHERE id = 1")
        .execute(&mut *conn)
        .await?;

    Ok(())
}
