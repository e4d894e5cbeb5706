//! Fixed bilingual phrases.

use kiosk_types::Language;

/// Invitation shown on the idle screen.
pub fn welcome(language: Language) -> &'static str {
    match language {
        Language::Thai => "กดปุ่มไมค์เพื่อสอบถามข้อมูลได้เลยครับ",
        Language::English => "Please tap the microphone to ask for information.",
    }
}

/// Spoken when no entry scores high enough.
pub fn not_found(language: Language) -> &'static str {
    match language {
        Language::Thai => {
            "ขออภัยครับ น้องนำทางไม่พบข้อมูลเรื่องนี้ กรุณาติดต่อเจ้าหน้าที่ที่เคาท์เตอร์ครับ"
        }
        Language::English => {
            "I'm sorry, I couldn't find any information on this topic. Please contact the officer at the counter."
        }
    }
}

/// Substituted when the matched entry has no answer in the active language.
pub fn not_in_language(language: Language) -> &'static str {
    match language {
        Language::Thai => "ขออภัยครับ ไม่พบข้อมูลเนื้อหาภาษาไทย",
        Language::English => {
            "I'm sorry, I couldn't find information on this topic in English. Please contact the officer at the counter."
        }
    }
}

/// Shown when a query arrives before the knowledge table has loaded.
pub fn please_wait(language: Language) -> &'static str {
    match language {
        Language::Thai => "กรุณารอสักครู่...",
        Language::English => "Please wait...",
    }
}

/// "Did you mean …?" prompt for a mid-confidence match.
pub fn did_you_mean(language: Language, key_phrase: &str) -> String {
    match language {
        Language::Thai => format!("หมายถึงเรื่อง \"{key_phrase}\" ใช่ไหมครับ?"),
        Language::English => format!("Did you mean \"{key_phrase}\"?"),
    }
}

pub fn confirm_label(language: Language) -> &'static str {
    match language {
        Language::Thai => "ใช่",
        Language::English => "Yes",
    }
}

pub fn deny_label(language: Language) -> &'static str {
    match language {
        Language::Thai => "ไม่ใช่",
        Language::English => "No",
    }
}
