//! The sample-story corpus.
//!
//! A small fixed set of flower stories served for recommendation previews.
//! Sampling is without replacement; the requested count is clamped to
//! [`MAX_SAMPLE_COUNT`] and then to the matching corpus size, never an
//! error. A category filter that matches nothing is the one not-found
//! condition.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Hard upper bound on one sample request.
pub const MAX_SAMPLE_COUNT: usize = 50;

const DEFAULT_SAMPLE_COUNT: usize = 3;

/// One story in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Stable story id.
    pub id: u32,
    /// Story category (occasion).
    pub category: String,
    /// Featured flower entity.
    pub flower: String,
    /// Story text.
    pub body: String,
}

/// The fixed story corpus.
#[derive(Debug, Clone)]
pub struct StoryCorpus {
    stories: Vec<Story>,
}

impl StoryCorpus {
    /// The built-in corpus.
    #[must_use]
    pub fn builtin() -> Self {
        let entries: &[(u32, &str, &str, &str)] = &[
            (1, "사랑", "rose", "백 번째 날, 그는 장미 한 송이에 쪽지를 접어 건넸다."),
            (2, "사랑", "tulip", "튤립이 피는 계절마다 두 사람은 같은 공원 벤치에서 만났다."),
            (3, "사랑", "lilium", "흰 백합 향이 번지던 저녁, 오래 미뤄 둔 고백이 시작됐다."),
            (4, "감사", "carnation", "스승의 날 아침, 교탁 위에 카네이션 바구니가 놓여 있었다."),
            (5, "감사", "freesia", "첫 월급날, 프리지아 다발을 들고 부모님 집 초인종을 눌렀다."),
            (6, "축하", "rose", "합격 발표가 나던 날, 현관 앞에 노란 장미가 기다리고 있었다."),
            (7, "축하", "tulip", "개업 화환 사이에서 가장 작은 튤립 화분이 제일 오래 살아남았다."),
            (8, "위로", "lilium", "장례식장에서 돌아온 밤, 백합 한 송이가 말없이 곁을 지켰다."),
            (9, "위로", "freesia", "병실 창가의 프리지아는 퇴원하던 날까지 시들지 않았다."),
            (10, "일상", "carnation", "시장 모퉁이 꽃집 주인은 매주 화요일 카네이션을 들여놓는다."),
            (11, "일상", "rose", "베란다의 장미 화분은 이사 세 번을 함께 견뎠다."),
            (12, "일상", "tulip", "출근길 지하철역 앞, 튤립 한 단이 천 원이던 봄이 있었다."),
        ];

        Self {
            stories: entries
                .iter()
                .map(|&(id, category, flower, body)| Story {
                    id,
                    category: category.to_string(),
                    flower: flower.to_string(),
                    body: body.to_string(),
                })
                .collect(),
        }
    }

    /// Number of stories in the corpus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// Returns true when the corpus holds no stories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// The distinct categories present, in corpus order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for story in &self.stories {
            if !seen.contains(&story.category) {
                seen.push(story.category.clone());
            }
        }
        seen
    }

    /// Samples stories without replacement.
    ///
    /// `count` defaults to a small preview size and is clamped to
    /// `1..=MAX_SAMPLE_COUNT`, then to the number of matching stories.
    /// Returns `None` only when `category` matches nothing.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: Option<usize>,
        category: Option<&str>,
    ) -> Option<Vec<Story>> {
        let matching: Vec<&Story> = self
            .stories
            .iter()
            .filter(|s| category.is_none_or(|c| s.category == c))
            .collect();
        if matching.is_empty() {
            return None;
        }

        let count = count
            .unwrap_or(DEFAULT_SAMPLE_COUNT)
            .clamp(1, MAX_SAMPLE_COUNT)
            .min(matching.len());

        Some(
            matching
                .choose_multiple(rng, count)
                .map(|&s| s.clone())
                .collect(),
        )
    }
}
