//! Static interview question catalog.
//!
//! One subject-less starter question followed by nine subject questions,
//! each with its follow-ups. The catalog order is the interview order.

use crate::types::{InterviewQuestion, QuestionKind, Subject};

pub fn question_catalog() -> Vec<InterviewQuestion> {
    vec![
        InterviewQuestion {
            id: "starter",
            kind: QuestionKind::Starter,
            subject: None,
            main_question: "به نظر شما مهمترین چالش و رنج دوران سالمندی چیه؟",
            follow_ups: vec![
                "چی شده که این مساله به نظرتون مهمه؟ (بررسی شناخت)",
                "به نظرتون ریشه و دلیل ایجاد این رنج چیه؟ (بررسی اسناد دهی)",
                "چه احساسی نسبت به این مساله دارید؟ (بررسی هیجان)",
                "با این مسئله چه کار کردید؟ (بررسی رفتار)",
            ],
        },
        InterviewQuestion {
            id: "q1",
            kind: QuestionKind::Main,
            subject: Some(Subject::PhysicalHealthAndSexualIssues),
            main_question: "در این دوره سنی توانمندی های انسان کاهش پیدا می کند. مثلا سلامت جسمی نسبت به جوانی کمتر میشود. برای شما این اتفاق افتاده؟",
            follow_ups: vec![
                "چه احساسی نسبت به این فقدان دارید؟",
                "نظرتون در مورد این کاهش سلامتی چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q2",
            kind: QuestionKind::Main,
            subject: Some(Subject::LossOfIndependence),
            main_question: "بعضی از افراد در دوره سالمندی به دلیل کاهش توانمندی ها احساس می کنند استقلال کمتری دارند. نظر شما در این باره چیست؟",
            follow_ups: vec![
                "چه احساسی نسبت به این مساله دارید؟",
                "نظرتون در مورد این مساله چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q3",
            kind: QuestionKind::Main,
            subject: Some(Subject::LossOfCloseOnesAndFearOfDeath),
            main_question: "آیا از دوستان و هم سن و سالان در اقوام کسی رو از دست داده اید؟",
            follow_ups: vec![
                "چه احساسی نسبت به این فقدان دارید؟",
                "نظرتون در مورد مرگ چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q4",
            kind: QuestionKind::Main,
            subject: Some(Subject::LossOfSocialActivity),
            main_question: "شما احتمالا بازنشسته شده اید درست است؟ برای شما این فاصله گرفتن از فضای شغلی و اجتماعی چه طور بوده؟",
            follow_ups: vec![
                "چه احساسی نسبت به بازنشستگی دارید؟",
                "نظرتون در مورد بازنشستگی چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q5",
            kind: QuestionKind::Main,
            subject: Some(Subject::LossOfIncome),
            main_question: "ایا به دلیل بازنشستگی و به دنبال کاهش فعالیت های شغلی با مشکلات اقتصادی هم مواجه شده اید؟ چالش های مالی هم داشته اید؟",
            follow_ups: vec![
                "چه احساسی نسبت به این مساله دارید؟",
                "نظرتون در مورد این مساله چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q6",
            kind: QuestionKind::Main,
            subject: Some(Subject::LossOfFamilyConnections),
            main_question: "آیا در این دوره سنی رفت و آمدها و ارتباطات خانوادگی و اجتماعی شما نسبت به دوران جوانی کاهش یافته؟",
            follow_ups: vec![
                "چه احساسی نسبت به این مساله دارید؟",
                "نظرتون در مورد این مساله چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q7",
            kind: QuestionKind::Main,
            subject: Some(Subject::LifestyleChanges),
            main_question: "ایا سبک کلی زندگی شما در این دوره از زندگی نسبت به دوره های قبل تغییر کرده؟",
            follow_ups: vec![
                "چه احساسی نسبت به این مساله دارید؟",
                "نظرتون در مورد این مساله چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q8",
            kind: QuestionKind::Main,
            subject: Some(Subject::LifeIntegrity),
            main_question: "در مورد گذشته و مسیری که در زندگی طی کرده اید چه احساسی دارید؟ اگر به گذشته برمی گشتید همین مسیر را پیش می گرفتید؟",
            follow_ups: vec![
                "چه احساسی نسبت به این مساله دارید؟",
                "نظرتون در مورد این مساله چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
        InterviewQuestion {
            id: "q9",
            kind: QuestionKind::Main,
            subject: Some(Subject::LossOfAspiration),
            main_question: "با چه انگیزه و امیدی صبح ها از خواب بیدار می شوید؟",
            follow_ups: vec![
                "چه احساسی نسبت به این مساله دارید؟",
                "نظرتون در مورد این مساله چیست؟",
                "در این رابطه کاری هم انجام داده اید؟",
            ],
        },
    ]
}

/// The main questions only, without the warm-up starter.
pub fn main_questions() -> Vec<InterviewQuestion> {
    question_catalog()
        .into_iter()
        .filter(|q| q.kind == QuestionKind::Main)
        .collect()
}

pub fn question_by_id(id: &str) -> Option<InterviewQuestion> {
    question_catalog().into_iter().find(|q| q.id == id)
}

/// Total count of questions including follow-ups, for progress reporting.
pub fn total_question_count() -> usize {
    question_catalog()
        .iter()
        .map(|q| 1 + q.follow_ups.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_starts_with_starter() {
        let catalog = question_catalog();
        assert_eq!(catalog[0].kind, QuestionKind::Starter);
        assert!(catalog[0].subject.is_none());
    }

    #[test]
    fn every_main_question_has_a_subject() {
        for q in main_questions() {
            assert!(q.subject.is_some(), "{} has no subject", q.id);
        }
    }

    #[test]
    fn nine_main_questions_cover_nine_subjects() {
        let subjects: std::collections::HashSet<_> =
            main_questions().iter().filter_map(|q| q.subject).collect();
        assert_eq!(subjects.len(), 9);
    }

    #[test]
    fn total_count_includes_follow_ups() {
        // starter (1 + 4) + nine mains (1 + 3 each)
        assert_eq!(total_question_count(), 5 + 9 * 4);
    }
}
