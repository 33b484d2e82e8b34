use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

const LETTERS: [&str; 18] = [
    "F-", "F", "F+", "E-", "E", "E+", "D-", "D", "D+", "C-", "C", "C+", "B-", "B", "B+", "A-",
    "A", "A+",
];

/// Seeded splitmix64 stream; the same seed always yields the same sample.
struct SeededRng(u64);

impl SeededRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

/// How a university reports grades.
#[derive(Clone, Copy)]
enum Notation {
    Letters,
    Scores,
    Mixed,
}

struct University {
    id: &'static str,
    notation: Notation,
    json: bool,
    subjects: &'static [&'static str],
    students: usize,
}

fn grade(rng: &mut SeededRng, notation: Notation) -> String {
    let letters = match notation {
        Notation::Letters => true,
        Notation::Scores => false,
        Notation::Mixed => rng.below(2) == 0,
    };
    if letters {
        rng.pick(&LETTERS).to_string()
    } else {
        (25 + rng.below(76)).to_string()
    }
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SeededRng(42);

    let universities = [
        University {
            id: "university_of_bristol",
            notation: Notation::Scores,
            json: false,
            subjects: &["physics", "maths", "chemistry"],
            students: 40,
        },
        University {
            id: "lse",
            notation: Notation::Letters,
            json: true,
            subjects: &["philosophy", "economics", "maths"],
            students: 30,
        },
        University {
            id: "ucl",
            notation: Notation::Mixed,
            json: false,
            subjects: &["physics", "art", "philosophy", "law"],
            students: 50,
        },
        University {
            id: "kings_college",
            notation: Notation::Mixed,
            json: true,
            subjects: &["law", "medicine"],
            students: 25,
        },
    ];

    let mut total_rows = 0;
    for uni in &universities {
        let rows: Vec<(String, String)> = (0..uni.students)
            .map(|_| {
                (
                    rng.pick(uni.subjects).to_string(),
                    grade(&mut rng, uni.notation),
                )
            })
            .collect();
        total_rows += rows.len();

        if uni.json {
            let path = out_dir.join(format!("{}.json", uni.id));
            let records: Vec<_> = rows
                .iter()
                .map(|(subject, grade)| json!({ "subject": subject, "grade": grade }))
                .collect();
            fs::write(&path, serde_json::to_string_pretty(&records)?)
                .with_context(|| format!("writing {}", path.display()))?;
        } else {
            let path = out_dir.join(format!("{}.csv", uni.id));
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("creating {}", path.display()))?;
            writer.write_record(["subject", "grade"])?;
            for (i, (subject, grade)) in rows.iter().enumerate() {
                // a header line pasted mid-file, as concatenated exports have
                if i == rows.len() / 2 {
                    writer.write_record(["subject", "grade"])?;
                }
                writer.write_record([subject, grade])?;
            }
            writer.flush()?;
        }
    }

    // Files the analysis is expected to skip.
    fs::write(out_dir.join("README.txt"), "Transcripts, one file per university.\n")?;
    fs::write(out_dir.join("empty_university.csv"), "")?;

    println!(
        "Wrote {total_rows} transcript rows for {} universities to {}",
        universities.len(),
        out_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededRng(42);
        let mut b = SeededRng(42);
        let first: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let second: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
        assert_ne!(SeededRng(7).next_u64(), first[0]);
    }

    #[test]
    fn scores_stay_in_range() {
        let mut rng = SeededRng(1);
        for _ in 0..500 {
            let score: usize = grade(&mut rng, Notation::Scores).parse().unwrap();
            assert!((25..=100).contains(&score));
            assert!(LETTERS.contains(&grade(&mut rng, Notation::Letters).as_str()));
        }
    }
}
