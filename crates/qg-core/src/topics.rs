//! Default topics suggested in setup.

use rand::{Rng, seq::SliceRandom};

use crate::model::Language;

/// Vietnamese suggestions
pub const VI: &[&str] = &[
    "Lịch sử Việt Nam",
    "Địa lý các châu lục",
    "Hệ Mặt Trời và các hành tinh",
    "Kiến thức cơ bản về Hóa học",
    "Sinh học tế bào",
    "Vật lý lượng tử cơ bản",
    "Môi trường và biến đổi khí hậu",
    "Khám phá đại dương",
    "Công nghệ AI và Machine Learning",
    "Khoa học vũ trụ hiện đại",
    "Văn học kinh điển thế giới",
    "Văn hóa ẩm thực Nhật Bản",
    "Âm nhạc cổ điển châu Âu",
    "Điện ảnh thế giới",
    "Thần thoại Hy Lạp",
    "Tôn giáo và triết học phương Đông",
    "Các kỳ quan thế giới cổ đại",
    "Phong tục Tết ở các quốc gia châu Á",
    "Chiến tranh thế giới thứ hai",
    "Lịch sử các đế chế châu Âu",
    "Lịch sử Trung Hoa cổ đại",
    "Lịch sử các kỳ World Cup",
    "Cách mạng công nghiệp lần thứ nhất",
    "Kiến thức cơ bản về lập trình Python",
    "Nguyên lý mạng máy tính",
    "An ninh mạng cơ bản",
    "Lịch sử Internet",
    "Phát minh công nghệ vĩ đại",
    "Robot và tự động hóa",
    "Điện tử cơ bản",
    "Động vật hoang dã châu Phi",
    "Các môn thể thao Olympic",
    "Du hành vũ trụ và NASA",
    "Khám phá cơ thể người",
    "Tâm lý học cơ bản",
    "Ngữ pháp tiếng Anh cơ bản",
    "Kỹ năng sống và giao tiếp",
    "Văn hóa Hàn Quốc hiện đại",
];

/// English suggestions
pub const EN: &[&str] = &[
    "History of Vietnam",
    "Geography of Continents",
    "The Solar System and Planets",
    "Basic Chemistry Knowledge",
    "Cell Biology",
    "Fundamentals of Quantum Physics",
    "Environment and Climate Change",
    "Ocean Exploration",
    "Artificial Intelligence and Machine Learning",
    "Modern Space Science",
    "World Classic Literature",
    "Japanese Culinary Culture",
    "European Classical Music",
    "World Cinema",
    "Greek Mythology",
    "Eastern Religion and Philosophy",
    "Ancient Wonders of the World",
    "Asian New Year Traditions",
    "World War II History",
    "European Empires History",
    "Ancient Chinese Civilization",
    "History of the FIFA World Cup",
    "The First Industrial Revolution",
    "Basics of Python Programming",
    "Computer Networking Principles",
    "Cybersecurity Fundamentals",
    "History of the Internet",
    "Great Technological Inventions",
    "Robotics and Automation",
    "Basic Electronics",
    "African Wildlife",
    "Olympic Sports",
    "NASA and Space Exploration",
    "Human Body Exploration",
    "Introduction to Psychology",
    "Basic English Grammar",
    "Life and Communication Skills",
    "Modern Korean Culture",
];

/// Suggestions for a language
pub const fn for_language(language: Language) -> &'static [&'static str] {
    match language {
        Language::Vi => VI,
        Language::En => EN,
    }
}

/// Pick any suggestion for `language`
pub fn random_topic<R: Rng + ?Sized>(language: Language, rng: &mut R) -> &'static str {
    for_language(language).choose(rng).copied().unwrap_or_default()
}

/// Pick a suggestion different from `current` whenever the list allows it
pub fn random_topic_except<R: Rng + ?Sized>(
    language: Language,
    current: &str,
    rng: &mut R,
) -> &'static str {
    let candidates: Vec<&'static str> = for_language(language)
        .iter()
        .copied()
        .filter(|t| *t != current)
        .collect();
    match candidates.choose(rng) {
        Some(topic) => *topic,
        // Single-entry list equal to `current`
        None => random_topic(language, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_lists_are_populated_and_distinct() {
        for language in Language::ALL {
            let topics = for_language(language);
            assert!(topics.len() > 30);
            let mut sorted = topics.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), topics.len(), "duplicate topic for {language}");
        }
    }

    #[test]
    fn test_random_topic_comes_from_language_list() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(EN.contains(&random_topic(Language::En, &mut rng)));
            assert!(VI.contains(&random_topic(Language::Vi, &mut rng)));
        }
    }

    #[test]
    fn test_random_topic_except_never_repeats() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut current = EN[0];
        for _ in 0..50 {
            let next = random_topic_except(Language::En, current, &mut rng);
            assert_ne!(next, current);
            current = next;
        }
    }

    #[test]
    fn test_random_topic_except_accepts_custom_topics() {
        let mut rng = StdRng::seed_from_u64(3);
        let next = random_topic_except(Language::Vi, "my own topic", &mut rng);
        assert!(VI.contains(&next));
    }
}
