//! Localized card labels.

use card_core::Language;

/// Static text drawn on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Labels {
    /// Header date caption.
    pub date: &'static str,
    /// Weight column caption.
    pub weight: &'static str,
    /// Intake column caption.
    pub intake: &'static str,
    /// Burned column caption.
    pub burned: &'static str,
    /// Macro section caption.
    pub macro_title: &'static str,
    /// Protein bar caption.
    pub protein: &'static str,
    /// Fat bar caption.
    pub fat: &'static str,
    /// Carbohydrate bar caption.
    pub carbs: &'static str,
    /// Reflection prompt above the note.
    pub reflection_prompt: &'static str,
    /// Shown under a masked weight.
    pub private: &'static str,
    /// Footer signature.
    pub mascot: &'static str,
}

const EN: Labels = Labels {
    date: "Date",
    weight: "Weight",
    intake: "Intake",
    burned: "Burned",
    macro_title: "Macro Balance",
    protein: "Protein",
    fat: "Fat",
    carbs: "Carbs",
    reflection_prompt: "Did you have a good day?",
    private: "PRIVATE",
    mascot: "ヘルシーくん",
};

const JA: Labels = Labels {
    date: "日付",
    weight: "体重",
    intake: "摂取カロリー",
    burned: "消費カロリー",
    macro_title: "PFCバランス",
    protein: "タンパク質 (P)",
    fat: "脂質 (F)",
    carbs: "炭水化物 (C)",
    reflection_prompt: "Did you have a good day?",
    private: "PRIVATE",
    mascot: "ヘルシーくん",
};

impl Labels {
    /// Label table for a language.
    #[must_use]
    pub fn for_language(language: Language) -> &'static Labels {
        match language {
            Language::En => &EN,
            Language::Ja => &JA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_differ_by_language() {
        assert_eq!(Labels::for_language(Language::En).weight, "Weight");
        assert_eq!(Labels::for_language(Language::Ja).weight, "体重");
    }
}
