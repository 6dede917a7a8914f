//! The registration questionnaire: question data and section texts.

use super::model::{
    QuestionDefinition, QuestionOption, QuestionType, RuleKind, SaveTarget, SkipCondition,
    SkipConditionItem, ValidationRule,
};
use super::text::BilingualText;
use crate::store::{Event, Shift};

/// Question ids the flow gives special treatment.
pub mod ids {
    pub const LANGUAGE: &str = "language";
    pub const EVENT_SELECTION: &str = "event_selection";
    pub const WOULD_YOU_LIKE_TO_REGISTER: &str = "would_you_like_to_register";
    pub const FULL_NAME: &str = "full_name";
    pub const RELEVANT_EXPERIENCE: &str = "relevant_experience";
    pub const PARTNER_OR_SINGLE: &str = "partner_or_single";
    pub const PRONOUNS: &str = "pronouns";
    pub const BDSM_EXPERIENCE: &str = "bdsm_experience";
    pub const FOOD_RESTRICTIONS: &str = "food_restrictions";
    pub const AGREE_PARTICIPANT_COMMITMENT: &str = "agree_participant_commitment";
    pub const AGREE_LINE_RULES: &str = "agree_line_rules";
    pub const AGREE_PLACE_RULES: &str = "agree_place_rules";
    pub const WANTS_TO_HELPER: &str = "wants_to_helper";
    pub const WANTS_TO_DM: &str = "wants_to_dm";
    pub const DM_SHIFTS: &str = "dm_shifts";
}

/// Event type whose registrations skip the BDSM section.
pub const CUDDLE: &str = "cuddle";

/// Registration field cleared when the line-rules answer misses the keyword.
pub const LINE_RULES_FIRST_TRY: &str = "line_rules_first_try";

/// Orders of the BDSM section.
pub const BDSM_BLOCK: std::ops::RangeInclusive<u32> = 14..=24;

pub fn skip_hint() -> BilingualText {
    BilingualText::new(
        "ניתן לדלג על השאלה. רשמו 'המשך'",
        "you can skip the question. write 'continue'",
    )
}

fn with_skip_hint(he: &str, en: &str) -> BilingualText {
    let hint = skip_hint();
    let join = |text: &str, hint: &str| {
        if text.is_empty() {
            hint.to_string()
        } else {
            format!("{text}\n{hint}")
        }
    };
    BilingualText::new(join(he, &hint.he), join(en, &hint.en))
}

fn required(he: &str, en: &str) -> ValidationRule {
    ValidationRule::new(RuleKind::Required, he, en)
}

fn select_option() -> ValidationRule {
    required("אנא בחר אופציה", "Please select an option")
}

fn max_200() -> ValidationRule {
    ValidationRule::new(
        RuleKind::MaxLength { max: 200 },
        "הטקסט ארוך מדי. אנא קצר",
        "Text is too long. Please shorten",
    )
}

fn invalid_date() -> ValidationRule {
    ValidationRule::new(
        RuleKind::DateRange,
        "התאריך אינו תקין. אנא הזן תאריך תקין",
        "Invalid date. Please enter a valid date",
    )
}

fn yes_no() -> Vec<QuestionOption> {
    vec![
        QuestionOption::new("yes", "כן", "Yes"),
        QuestionOption::new("no", "לא", "No"),
    ]
}

fn yes_maybe_no() -> Vec<QuestionOption> {
    vec![
        QuestionOption::new("yes", "כן", "Yes"),
        QuestionOption::new("maybe", "אולי", "Maybe"),
        QuestionOption::new("no", "לא", "No"),
    ]
}

fn skip_if(items: Vec<SkipConditionItem>) -> SkipCondition {
    SkipCondition::any(items)
}

/// Options for the event question: one per upcoming event.
pub fn event_options(events: &[Event]) -> Vec<QuestionOption> {
    events
        .iter()
        .map(|e| {
            let label = format!("{} - {} ({})", e.start_date, e.name, e.event_type);
            QuestionOption {
                value: e.id.clone(),
                text: BilingualText::new(label.clone(), label),
            }
        })
        .collect()
}

pub fn shift_options(shifts: &[Shift]) -> Vec<QuestionOption> {
    shifts
        .iter()
        .map(|s| QuestionOption {
            value: s.id.clone(),
            text: BilingualText::new(s.label.clone(), s.label.clone()),
        })
        .collect()
}

/// Every question in the form, with dynamic option lists filled in.
pub fn question_definitions(events: &[Event], shifts: &[Shift]) -> Vec<QuestionDefinition> {
    use QuestionType::*;
    use SaveTarget::*;

    let cuddle = || SkipConditionItem::event_type(CUDDLE);

    vec![
        QuestionDefinition::new(
            ids::LANGUAGE,
            Select,
            1,
            "באיזו שפה תרצה למלא את הטופס?",
            "In which language would you like to fill the form?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("he", "עברית", "Hebrew"),
            QuestionOption::new("en", "English", "English"),
        ])
        .with_rule(required("אנא בחר שפה", "Please select a language")),
        QuestionDefinition::new(
            ids::EVENT_SELECTION,
            Select,
            2,
            "לאיזה אירוע תרצה להירשם?",
            "To which event would you like to register?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(event_options(events))
        .with_rule(required("אנא בחר אירוע", "Please select an event")),
        QuestionDefinition::new(
            "interested_in_event_types",
            MultiSelect,
            3,
            "מה סוגי האירועים שתרצה להשתתף בהם?",
            "What type of events would you like to participate in?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("play", "משחק", "Play"),
            QuestionOption::new(CUDDLE, "כירבולייה", "Cuddle"),
        ])
        .with_rule(required("אנא בחר סוג אירוע", "Please select an event type")),
        QuestionDefinition::new(
            ids::WOULD_YOU_LIKE_TO_REGISTER,
            Boolean,
            4,
            "האם תרצה להירשם לאירוע?",
            "Would you like to register to this event?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(yes_no())
        .with_rule(select_option()),
        // Personal details
        QuestionDefinition::new(ids::FULL_NAME, Text, 5, "מה השם המלא שלך?", "What is your full name?")
            .with_save_to(Users)
            .with_required(true)
            .with_placeholder(BilingualText::new("הזן שם מלא", "Enter full name"))
            .with_skip(skip_if(vec![SkipConditionItem::user_exists(ids::FULL_NAME)]))
            .with_rule(required("אנא הזן את שמך המלא", "Please enter your full name"))
            .with_rule(ValidationRule::new(
                RuleKind::MinLength { min: 2 },
                "השם חייב להכיל לפחות 2 תווים",
                "Name must contain at least 2 characters",
            )),
        QuestionDefinition::new(
            ids::RELEVANT_EXPERIENCE,
            Text,
            6,
            "מה הניסיון שלך באירועים דומים?",
            "What is your experience with similar events?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_rule(required("אנא הזן רמת ניסיון", "Please enter experience")),
        QuestionDefinition::new(
            ids::PARTNER_OR_SINGLE,
            Select,
            7,
            "האם אתה/את מגיע/ה לבד או עם פרטנר?",
            "Are you coming alone or with a partner?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("single", "לבד", "Alone"),
            QuestionOption::new("partner", "עם פרטנר", "With partner"),
        ])
        .with_rule(select_option()),
        QuestionDefinition::new(
            "partner_telegram_link",
            TelegramLink,
            8,
            "אנא שתף לינק לטלגרם של הפרטנר שלך",
            "Please share your partner's Telegram link",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_placeholder(BilingualText::new(
            "https://t.me/username Or @username",
            "https://t.me/username Or @username",
        ))
        .with_skip(skip_if(vec![SkipConditionItem::field_equals(
            ids::PARTNER_OR_SINGLE,
            "single",
        )]))
        .with_rule(required("אנא הזן לינק לטלגרם", "Please enter Telegram link"))
        .with_rule(ValidationRule::new(
            RuleKind::TelegramLinkFormat,
            "הלינק אינו תקין. אנא הזן לינק תקין לטלגרם\nhttps://t.me/username Or @username",
            "Invalid link. Please enter a valid Telegram link\nhttps://t.me/username Or @username",
        )),
        QuestionDefinition::new(
            "last_sti_test",
            Date,
            9,
            "מה התאריך של בדיקת המין האחרונה שלך?",
            "What is the date of your last STI test?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_placeholder(BilingualText::new("DD/MM/YYYY", "DD/MM/YYYY"))
        .with_skip(skip_if(vec![cuddle()]))
        .with_rule(required("אנא הזן תאריך בדיקה", "Please enter test date"))
        .with_rule(invalid_date()),
        QuestionDefinition::new(
            "facebook_profile",
            FacebookLink,
            10,
            "אנא שתף לינק לפרופיל הפייסבוק או האינסטגרם שלך",
            "Please share a link to your Facebook OR Instagram profile",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_placeholder(BilingualText::new(
            "https://facebook.com/username Or https://instagram.com/username",
            "https://facebook.com/username Or https://instagram.com/username",
        ))
        .with_skip(skip_if(vec![SkipConditionItem::user_exists("facebook_profile")]))
        .with_rule(required(
            "אנא הזן לינק לפייסבוק או לאינסטגרם",
            "Please enter Facebook or Instagram link",
        ))
        .with_rule(ValidationRule::new(
            RuleKind::FacebookLinkFormat,
            "הלינק אינו תקין. אנא הזן לינק תקין לפייסבוק או לאינסטגרם",
            "Invalid link. Please enter a valid Facebook or Instagram link",
        )),
        QuestionDefinition::new("birth_date", Date, 11, "מה תאריך הלידה שלך?", "What is your birth date?")
            .with_save_to(Users)
            .with_required(true)
            .with_placeholder(BilingualText::new("DD/MM/YYYY", "DD/MM/YYYY"))
            .with_skip(skip_if(vec![SkipConditionItem::user_exists("birth_date")]))
            .with_rule(required("אנא הזן תאריך לידה", "Please enter birth date"))
            .with_rule(invalid_date())
            .with_rule(ValidationRule::new(
                RuleKind::AgeRange {
                    min_age: 18,
                    max_age: 100,
                },
                "הגיל חייב להיות בין 18 ל-100",
                "Age must be between 18 and 100",
            )),
        QuestionDefinition::new(
            "sexual_orientation_and_gender",
            Text,
            12,
            "נטייה מינית ומגדר",
            "Sexual orientation and gender",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_placeholder(BilingualText::new(
            "למשל: זכר סטרייט, אישה לסבית, אחר",
            "for example: male straight, female bi, other",
        ))
        .with_rule(required("אנא מלא את השדה", "Please fill in this field")),
        QuestionDefinition::new(ids::PRONOUNS, Text, 13, "מה לשון הפניה שלך?", "What are your pronouns?")
            .with_save_to(Users)
            .with_placeholder(with_skip_hint("למשל: את / אתה / הם", "for example: she/he/they"))
            .with_rule(max_200()),
        // BDSM section
        QuestionDefinition::new(
            ids::BDSM_EXPERIENCE,
            MultiSelect,
            14,
            "מה רמת הניסיון שלך ב-BDSM?",
            "What is your BDSM experience level?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new(
                "none_not_interested",
                "אין לי נסיון וגם לא מתעניין.ת בבדס\"מ",
                "No experience and not interested in BDSM",
            ),
            QuestionOption::new(
                "none_interested_top",
                "אין לי נסיון אבל מעניין אותי לנסות לשלוט",
                "No experience but interested in trying to top",
            ),
            QuestionOption::new(
                "none_interested_bottom",
                "אין לי נסיון אבל מעניין אותי לנסות להישלט",
                "No experience but interested in trying to bottom",
            ),
            QuestionOption::new(
                "experienced_top",
                "יש לי נסיון בתור טופ/שולט.ת",
                "I have experience as a top/dominant",
            ),
            QuestionOption::new(
                "experienced_bottom",
                "יש לי נסיון בתור בוטום/נשלט.ת",
                "I have experience as a bottom/submissive",
            ),
            QuestionOption::new("other", "אחר", "Other"),
        ])
        .with_skip(skip_if(vec![cuddle()]))
        .with_rule(required("אנא בחר רמת ניסיון", "Please select experience level")),
        QuestionDefinition::new(
            "bdsm_declaration",
            Select,
            15,
            "האירוע הינו בדסמ פרנדלי, ויכלול אקטים בדס\"מים / מיניים שונים על פי רצון המשתתפים. איני מחוייב.ת להשתתף באף אקט ואסרב בנימוס אם יציעו לי אקט שאיני מעוניין.ת בו",
            "The event is BDSM friendly, and will include various BDSM / sexual acts according to the wishes of the participants. I am not obliged to participate in any act and will politely refuse an offer for an act that I am not interested in.",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("yes", "כמובן", "Of course"),
            QuestionOption::new(
                "no",
                "לא ברור לי הסעיף, אשמח להבהרה",
                "I don't understand, please clarify",
            ),
        ])
        .with_skip(skip_if(vec![cuddle()]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            "is_play_with_partner_only",
            Select,
            16,
            "האם תהיה מעוניין לשחק אך ורק עם הפרטנר שתגיעו איתו או גם עם אנשים נוספים?",
            "Would you like to play only with the partner you are coming with, or also with other people?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("partner_only", "רק עם פרטנר", "Only with my partner"),
            QuestionOption::new("other_people", "גם עם אחרים", "Also with other people"),
        ])
        .with_skip(skip_if(vec![
            cuddle(),
            SkipConditionItem::field_equals(ids::PARTNER_OR_SINGLE, "single"),
        ]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            "desired_play_partners",
            MultiSelect,
            17,
            "עם מי תרצה לשחק באירוע?",
            "Who would you like to play with?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("all_genders", "יש לי עניין עם כל המגדרים", "I am interested in all genders"),
            QuestionOption::new("women_only", "יש לי עניין עם נשים* בלבד", "I am interested in women* only"),
            QuestionOption::new("men_only", "יש לי עניין עם גברים* בלבד", "I am interested in men* only"),
            QuestionOption::new("couples", "יש לי עניין עם זוג", "I am interested in couples"),
            QuestionOption::new(
                "partner_dependent",
                "יש לי עניין אך זה תלוי בהסכמות של בן/בת הזוג",
                "I am interested but it depends on my partner's consent",
            ),
        ])
        .with_skip(skip_if(vec![
            cuddle(),
            SkipConditionItem::field_equals("is_play_with_partner_only", "partner_only"),
        ]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            "contact_type",
            Select,
            18,
            "באיזה סוג מגע תהיה מעוניינ.ת?",
            "What type of contact would you like?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("bdsm_only", "בדס״מ בלבד", "BDSM only"),
            QuestionOption::new("bdsm_and_sexual", "בדס״מ ומיניות", "BDSM and sexual"),
            QuestionOption::new("other", "אחר", "Other"),
        ])
        .with_skip(skip_if(vec![
            cuddle(),
            SkipConditionItem::field_equals("is_play_with_partner_only", "partner_only"),
        ]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            "contact_type_other",
            Text,
            19,
            "אנא פרט לגבי סוג המגע הרצוי",
            "Please elaborate on the type of contact you would like",
        )
        .with_save_to(Registrations)
        .with_skip(skip_if(vec![
            cuddle(),
            SkipConditionItem::field_not_in("contact_type", &["other"]),
        ]))
        .with_rule(max_200()),
        QuestionDefinition::new(
            "share_bdsm_interests",
            Boolean,
            20,
            "אשמח לשמוע על הגבולות וההעדפות שלכם",
            "We would love to hear about your limits and preferences",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("yes", "יאללה", "Sure"),
            QuestionOption::new("no", "לא מעוניין לשתף", "Don't want to share"),
        ])
        .with_skip(skip_if(vec![cuddle()]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            "limits_preferences_matrix",
            MultiSelect,
            21,
            "גבולות והעדפות?",
            "Limits and preferences?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_options(yes_no())
        .with_skip(skip_if(vec![
            cuddle(),
            SkipConditionItem::field_equals("share_bdsm_interests", "no"),
        ]))
        .with_rule(select_option()),
        QuestionDefinition::new("boundaries_text", Text, 22, "גבולות - טקסט חופשי", "Boundaries - free text")
            .with_save_to(Users)
            .with_placeholder(with_skip_hint("תרשמו במילים שלכם", "Write in your own words"))
            .with_skip(skip_if(vec![
                cuddle(),
                SkipConditionItem::field_equals("share_bdsm_interests", "no"),
            ]))
            .with_rule(max_200()),
        QuestionDefinition::new("preferences_text", Text, 23, "העדפות - טקסט חופשי", "Preferences - free text")
            .with_save_to(Users)
            .with_placeholder(with_skip_hint("תרשמו במילים שלכם", "Write in your own words"))
            .with_skip(skip_if(vec![
                cuddle(),
                SkipConditionItem::field_equals("share_bdsm_interests", "no"),
            ]))
            .with_rule(max_200()),
        QuestionDefinition::new(
            "bdsm_comments",
            Text,
            24,
            "הערות חופשיות בנושא BDSM",
            "Anything else you'd like to share about BDSM?",
        )
        .with_save_to(Users)
        .with_placeholder(with_skip_hint("", ""))
        .with_skip(skip_if(vec![cuddle()])),
        // Food
        QuestionDefinition::new(
            ids::FOOD_RESTRICTIONS,
            MultiSelect,
            25,
            "האם יש מגבלות אוכל?",
            "Are there any food restrictions?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("no", "לא", "No"),
            QuestionOption::new("vegetarian", "צמחוני", "Vegetarian"),
            QuestionOption::new("vegan", "טבעוני", "Vegan"),
            QuestionOption::new("kosher", "כשרות", "Kosher"),
            QuestionOption::new("allergies", "אלרגיות", "Allergies"),
            QuestionOption::new("gluten_free", "ללא גלוטן", "Gluten free"),
            QuestionOption::new("lactose_free", "ללא לקטוז", "Lactose free"),
            QuestionOption::new("other", "אחר", "Other"),
        ])
        .with_rule(required("אנא בחר לפחות אופציה אחת", "Please select at least one option")),
        QuestionDefinition::new(
            "food_comments",
            Text,
            26,
            "אנא פרטו בנושא הגבלות אוכל",
            "Please elaborate on the food restrictions",
        )
        .with_save_to(Users)
        .with_placeholder(with_skip_hint("", ""))
        .with_rule(max_200()),
        QuestionDefinition::new(
            "alcohol_in_event",
            Select,
            27,
            "האם תרצה אלכוהול באירוע (בתוספת תשלום)?",
            "Would you like alcohol at the event (with additional payment)?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(yes_maybe_no())
        .with_rule(select_option()),
        QuestionDefinition::new(
            "alcohol_preference",
            Text,
            28,
            "מה האלכוהול המועדף עליך?",
            "What is your alcohol preference?",
        )
        .with_save_to(Users)
        .with_placeholder(with_skip_hint("", ""))
        .with_skip(skip_if(vec![SkipConditionItem::field_equals("alcohol_in_event", "no")])),
        // Rules
        QuestionDefinition::new(
            ids::AGREE_PARTICIPANT_COMMITMENT,
            Select,
            29,
            "האם זה מובן?",
            "Do you agree to the participant commitment?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new(
                "yes",
                "הבנתי את הכתוב ומה שמצופה ממני כמשתתפ/ת. אני מסכימ/ה ומאשר/ת",
                "I understand what is expected of me as a participant and I agree",
            ),
            QuestionOption::new(
                "no",
                "לא הבנתי או אני לא בטוח/ה שהבנתי מה מצופה ממני כמשתתפ/ת באירוע",
                "I am not sure I understand what is expected of me as a participant",
            ),
            QuestionOption::new("else", "אחר - נחזור אליך כדי לברר", "Other - we will get back to you"),
        ])
        .with_rule(select_option()),
        QuestionDefinition::new(
            "enthusiastic_verbal_consent_commitment",
            Boolean,
            30,
            "האם זה ברור שיש לקבל הסכמה מפורשת לכל מגע ואינטראקציה עם אדם אחר?",
            "Is it clear that explicit consent is required for every touch and interaction with another person?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("yes", "ברור בהחלט", "Absolutely clear"),
            QuestionOption::new("no", "לא ברור לי, אשמח להבהרה", "Not clear, please clarify"),
        ])
        .with_rule(select_option()),
        QuestionDefinition::new(
            ids::AGREE_LINE_RULES,
            Text,
            31,
            "האם קראת את חוקי הליין ואתה מאשר אותם?",
            "Do you agree to the line rules?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_rule(required(
            "אנא קרא את חוקי הליין היטב ואשר אותם",
            "Please read the line rules carefully and agree to them",
        ))
        .with_rule(ValidationRule::new(
            RuleKind::Regex {
                pattern: "זנגביל|ginger".into(),
                failure_flag: Some(LINE_RULES_FIRST_TRY.into()),
            },
            "אנא קרא את חוקי הליין היטב ואשר אותם",
            "Please read the line rules carefully and agree to them",
        )),
        QuestionDefinition::new(
            ids::AGREE_PLACE_RULES,
            Select,
            32,
            "האם קראת את חוקי המקום ואתה מאשר אותם?",
            "Do you agree to the place rules?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(yes_no())
        .with_rule(select_option()),
        // Helpers and DMs
        QuestionDefinition::new(
            ids::WANTS_TO_HELPER,
            Boolean,
            33,
            "האם אתה/את מעוניין/ת לעזור באירוע?",
            "Do you want to help at the event?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_placeholder(BilingualText::new(
            "על מנת להרים כזאת הפקה אנו זקוקות לעזרה. הלפרים מקבלים 25% הנחה.",
            "Putting on an event like this takes help. Helpers get a 25% discount.",
        ))
        .with_options(yes_maybe_no())
        .with_rule(select_option()),
        QuestionDefinition::new(
            "helper_shifts",
            Select,
            34,
            "מתי אתה/את מעוניין/ת לעזור באירוע?",
            "When do you want to help at the event?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(vec![
            QuestionOption::new("before", "להגיע מוקדם ולעזור בהקמה", "Come early to help set up"),
            QuestionOption::new("after", "להישאר אחרי ולעזור בניקיון", "Stay after to help clean up"),
            QuestionOption::new("both", "שניהם", "Both"),
        ])
        .with_skip(skip_if(vec![SkipConditionItem::field_equals(ids::WANTS_TO_HELPER, "no")]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            "is_certified_dm",
            Boolean,
            35,
            "האם את/ה DM מוסמך?",
            "Are you certified to be a DM?",
        )
        .with_save_to(Users)
        .with_required(true)
        .with_options(yes_no())
        .with_rule(select_option()),
        QuestionDefinition::new(
            ids::WANTS_TO_DM,
            Boolean,
            36,
            "האם תרצה/י להיות DM באירוע?",
            "Would you like to be a DM at the event?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_options(yes_maybe_no())
        .with_skip(skip_if(vec![SkipConditionItem::field_equals("is_certified_dm", "no")]))
        .with_rule(select_option()),
        QuestionDefinition::new(
            ids::DM_SHIFTS,
            MultiSelect,
            37,
            "איזה משמרות יכולות להתאים לך?",
            "Which shifts would suit you?",
        )
        .with_save_to(Registrations)
        .with_required(true)
        .with_placeholder(BilingualText::new(
            "אשתדל לאפשר לכל אחד את הבחירות שלו.",
            "We will try to honour everyone's choices.",
        ))
        .with_options(shift_options(shifts))
        .with_skip(skip_if(vec![SkipConditionItem::field_equals(ids::WANTS_TO_DM, "no")]))
        .with_rule(select_option()),
    ]
}

/// Section introductions sent before specific questions.
pub fn intro_texts() -> Vec<(&'static str, BilingualText)> {
    vec![
        (
            ids::FULL_NAME,
            BilingualText::new(
                "*פרטים אישיים*\nאיזה כיף שאתה מתעניין באירוע! נעבור על כמה שאלות כל מנת להכיר אותך טוב יותר.",
                "*Personal details*\nIt's great that you're interested in the event! We'll go through a few questions to get to know you better.",
            ),
        ),
        (
            ids::BDSM_EXPERIENCE,
            BilingualText::new(
                "*בואו נדבר בדס\"מ*\nנעים מהכיר! היות ומדובר על אירוע בדסמי נעבור כעת על כמה שאלות בנושא.",
                "*Let's talk BDSM*\nNice to meet you! Since this is a BDSM event, we'll go through a few questions on the subject.",
            ),
        ),
        (
            ids::FOOD_RESTRICTIONS,
            BilingualText::new("*אוכל ושאר ירקות*", "*Food, truffles, and trifles*"),
        ),
        (
            ids::AGREE_PARTICIPANT_COMMITMENT,
            BilingualText::new(
                "*חוקים*\nכמעט סוף. בואו נעבור על חוקי הליין, המקום וכו'.",
                "*Rules*\nAlmost done. Let's go through the line rules, the place, and so on.",
            ),
        ),
        (
            ids::WANTS_TO_HELPER,
            BilingualText::new(
                "*הלפרים ו DM-ים*\nזהו! סיימנו, אך לפני שאני משחרר אתכם, אשמח לדעת האם תרצו לעזור באירוע (בתמורה להנחה בעלות האירוע)",
                "*Helpers and DMs*\nThat's it! We're done, but before I let you go, I'd like to know if you'd like to help at the event (in exchange for a discount on the event's cost)",
            ),
        ),
        (
            ids::WANTS_TO_DM,
            BilingualText::new(
                "לטובת שמירה מיטבית על המרחב ועל מנת שכולנו נוכל גם להנות, נהיה צוות של דיאמים. DM מקבל כניסה זוגית חינם",
                "We will have a team of DMs to keep the space and everyone in it safe, so that we can all enjoy ourselves. DMs get free entry for two.",
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn orders_are_unique_and_language_first() {
        let questions = question_definitions(&[], &[]);
        let orders: HashSet<u32> = questions.iter().map(|q| q.order).collect();
        assert_eq!(orders.len(), questions.len());
        let first = questions.iter().min_by_key(|q| q.order).unwrap();
        assert_eq!(first.id, ids::LANGUAGE);
        assert_eq!(questions.len(), 37);
    }

    #[test]
    fn bdsm_block_is_guarded_by_event_type() {
        for q in question_definitions(&[], &[]) {
            if BDSM_BLOCK.contains(&q.order) {
                let skip = q.skip.as_ref().unwrap_or_else(|| panic!("{} has no skip", q.id));
                assert!(
                    skip.items.contains(&SkipConditionItem::event_type(CUDDLE)),
                    "{} is missing the cuddle guard",
                    q.id
                );
            }
        }
    }

    #[test]
    fn dynamic_options_come_from_inputs() {
        let events = vec![Event {
            id: "E1".into(),
            name: "Ginger Night".into(),
            event_type: "play".into(),
            start_date: "2026-11-20".into(),
            ..Default::default()
        }];
        let shifts = vec![Shift {
            id: "first".into(),
            label: "21:00-1:00".into(),
        }];
        let questions = question_definitions(&events, &shifts);
        let event_q = questions.iter().find(|q| q.id == ids::EVENT_SELECTION).unwrap();
        assert_eq!(event_q.options[0].value, "E1");
        assert_eq!(event_q.options[0].text.en, "2026-11-20 - Ginger Night (play)");
        let shift_q = questions.iter().find(|q| q.id == ids::DM_SHIFTS).unwrap();
        assert_eq!(shift_q.options[0].text.he, "21:00-1:00");
    }

    #[test]
    fn skip_hint_is_appended() {
        let placeholder = with_skip_hint("למשל", "for example");
        assert_eq!(placeholder.en, "for example\nyou can skip the question. write 'continue'");
        assert_eq!(with_skip_hint("", "").en, skip_hint().en);
    }
}
