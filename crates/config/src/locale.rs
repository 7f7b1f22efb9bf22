//! Localized text: persona prompts, tool description, style fragments,
//! and user-facing notices for every supported language.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A supported interface and answer language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Tr,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Tr => "tr",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "tr" | "turkish" | "türkçe" => Ok(Self::Tr),
            other => Err(format!("unsupported language '{other}' (expected 'en' or 'tr')")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The text table for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    pub language: Language,

    /// Default coach persona (base system prompt)
    pub persona: &'static str,

    /// Description of the retrieval tool, shown to the model
    pub retriever_description: &'static str,

    /// Description of the retrieval tool's `query` argument
    pub query_description: &'static str,

    /// Returned by the retrieval tool when nothing matched
    pub no_results: &'static str,

    /// Label placed before a chunk's source in retrieval output
    pub source_label: &'static str,

    /// Answer used when the model produced no usable text
    pub fallback_answer: &'static str,

    /// Answer used when the tool loop hit its iteration bound
    pub max_iterations_notice: &'static str,

    /// Style fragments, each carrying its word bound
    pub style_concise: &'static str,
    pub style_normal: &'static str,
    pub style_creative: &'static str,

    /// Appended last in structured-reasoning mode
    pub reasoning_directive: &'static str,

    /// Shown while a turn is in progress
    pub thinking: &'static str,

    pub welcome: &'static str,

    pub no_documents: &'static str,
}

impl Locale {
    pub fn for_language(language: Language) -> &'static Locale {
        match language {
            Language::En => &EN,
            Language::Tr => &TR,
        }
    }
}

static EN: Locale = Locale {
    language: Language::En,
    persona: "You are a professional fitness coach and nutrition expert.

RULES:
- DO NOT mention yoga, meditation or spiritual practices
- Only suggest classic fitness exercises (push-ups, dumbbells, squats, etc.)
- REMEMBER PREVIOUS CONVERSATION and answer follow-up questions intelligently
- Understand references like \"it\", \"this\", \"those\" from previous messages
- ANSWER IN ENGLISH",
    retriever_description: "Searches fitness and nutrition information from PDFs. Use for: exercise, nutrition, protein, workout questions.",
    query_description: "What to look up, phrased as a short search query",
    no_results: "No relevant information was found in the fitness knowledge base.",
    source_label: "Source",
    fallback_answer: "Sorry, I couldn't put together an answer. Could you rephrase your question?",
    max_iterations_notice: "I couldn't finish researching this question. Please try asking it more specifically.",
    style_concise: "RESPONSE STYLE: Be brief and direct. Use at most 100 words.",
    style_normal: "RESPONSE STYLE: Give a balanced, practical answer. Use at most 200 words.",
    style_creative: "RESPONSE STYLE: Be engaging and motivating. Examples and analogies are welcome. Use at most 300 words.",
    reasoning_directive: "RESPONSE FORMAT: First think step by step inside <thinking></thinking> tags: what the user is asking, what you know from the conversation and the knowledge base, and how to answer. Then write the final answer after the closing </thinking> tag. Never put the final answer inside the tags.",
    thinking: "Thinking...",
    welcome: "Welcome! Ask a fitness or nutrition question, or type /exit to quit.",
    no_documents: "No documents found in the knowledge folder; answering without retrieval.",
};

static TR: Locale = Locale {
    language: Language::Tr,
    persona: "Sen profesyonel bir fitness koçu ve beslenme uzmanısın.

KURALLAR:
- Yoga, meditasyon veya ruhani pratiklerden BAHSETME
- Sadece klasik fitness egzersizleri öner (şınav, dambıl, squat, vb.)
- ÖNCEKİ KONUŞMAYI HATIRLA ve takip sorularını akıllıca yanıtla
- \"onu\", \"bunu\", \"bunlar\" gibi referansları önceki mesajlardan anla
- TÜRKÇE CEVAP VER",
    retriever_description: "Fitness ve beslenme bilgilerini içeren PDF'lerden arama yapar. Kullan: egzersiz, beslenme, protein, antrenman soruları için.",
    query_description: "Aranacak konu, kısa bir arama sorgusu olarak",
    no_results: "Fitness bilgi tabanında ilgili bilgi bulunamadı.",
    source_label: "Kaynak",
    fallback_answer: "Üzgünüm, bir cevap oluşturamadım. Sorunuzu farklı şekilde sorabilir misiniz?",
    max_iterations_notice: "Bu soruyu araştırmayı tamamlayamadım. Lütfen daha spesifik sormayı deneyin.",
    style_concise: "CEVAP STİLİ: Kısa ve net ol. En fazla 100 kelime kullan.",
    style_normal: "CEVAP STİLİ: Dengeli ve pratik bir cevap ver. En fazla 200 kelime kullan.",
    style_creative: "CEVAP STİLİ: İlgi çekici ve motive edici ol. Örnekler ve benzetmeler kullanabilirsin. En fazla 300 kelime kullan.",
    reasoning_directive: "CEVAP FORMATI: Önce <thinking></thinking> etiketleri içinde adım adım düşün: kullanıcı ne soruyor, konuşmadan ve bilgi tabanından ne biliyorsun, nasıl cevap vereceksin. Sonra nihai cevabı kapanış </thinking> etiketinden sonra yaz. Nihai cevabı asla etiketlerin içine koyma.",
    thinking: "Düşünüyorum...",
    welcome: "Hoş geldiniz! Bir fitness veya beslenme sorusu sorun, çıkmak için /exit yazın.",
    no_documents: "Bilgi klasöründe belge bulunamadı; arama olmadan cevap veriliyor.",
};
