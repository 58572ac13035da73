//! Runner de consola: recorre el flujo completo (lección → resumen → quiz →
//! resultado) contra el backend si `STAT_PATH_API` está definida, o contra
//! el banco offline embebido en caso contrario.

use std::io::{self, Write};

use stat_path::api::{HttpLessonService, LessonService, OfflineLessonService};
use stat_path::model::{Answer, FlowStep, QuestionKind};
use stat_path::{FileBackend, FlowConfig, FlowController, ProgressTracker};

fn main() {
    pretty_env_logger::init();

    let service: Box<dyn LessonService> = if std::env::var("STAT_PATH_API").is_ok() {
        Box::new(HttpLessonService::from_env())
    } else {
        Box::new(OfflineLessonService)
    };

    let tracker = ProgressTracker::new(Box::new(FileBackend::open_default()));
    let mut flow = FlowController::new(service, tracker, FlowConfig::default());

    println!("📊 StatPath — estadística paso a paso\n");

    loop {
        let catalog = flow.catalog().to_vec();
        println!("Lecciones:");
        for entry in &catalog {
            let progress = flow.progress_for(&entry.slug);
            let marker = if progress.passed == Some(true) {
                "✅"
            } else if flow.is_lesson_locked(&entry.slug) {
                "🔒"
            } else {
                "🔓"
            };
            println!("  {}. {} {}", entry.number, entry.title, marker);
        }

        let input = read_line("\nNúmero de lección (q para salir): ");
        if input.eq_ignore_ascii_case("q") {
            println!("¡Hasta la próxima!");
            return;
        }
        let slug = match input.parse::<usize>().ok().and_then(|n| {
            catalog.iter().find(|l| l.number == n).map(|l| l.slug.clone())
        }) {
            Some(slug) => slug,
            None => {
                println!("⚠ Opción no válida.\n");
                continue;
            }
        };

        if flow.is_lesson_locked(&slug) {
            // soft lock: se puede mirar el contenido, pero sin crédito
            println!("🔒 Lección bloqueada para crédito: completa antes la anterior. Se abre en modo consulta.");
        }

        run_lesson(&mut flow, &slug);
        println!();
    }
}

enum ResultAction {
    Retry,
    Next(String),
    Menu,
}

fn run_lesson(flow: &mut FlowController, slug: &str) {
    flow.open_lesson(slug);
    if let Some(notice) = flow.take_notice() {
        println!("{notice}");
    }

    // 1) Diapositivas
    loop {
        let slide = match flow.current_slide() {
            Some(s) => s.clone(),
            None => break,
        };
        println!(
            "\n—— [{}/{}] {} ——",
            flow.slide_index() + 1,
            flow.slides().len(),
            slide.title
        );
        println!("{}", slide.content);
        if let Some(highlight) = &slide.highlight {
            println!("💡 {highlight}");
        }

        if !flow.advance_slide() {
            break;
        }
        read_line("[Enter para continuar] ");
    }
    flow.finish_slides();

    // 2) Resumen
    println!("\n══ Resumen ({}%) ══", FlowController::step_progress(FlowStep::Summary));
    for point in flow.summary_points() {
        println!("  • {point}");
    }
    if !read_line("\n¿Hacer el quiz? (s/n): ").eq_ignore_ascii_case("s") {
        return;
    }
    if !flow.start_quiz() {
        if let Some(notice) = flow.take_notice() {
            println!("{notice}");
        }
        return;
    }
    if let Some(notice) = flow.take_notice() {
        println!("{notice}");
    }

    // 3) Quiz y resultado, con reintentos hasta volver al menú
    loop {
        run_quiz(flow);
        match result_action(flow) {
            ResultAction::Retry => println!("🔄 Quiz reiniciado, ¡a por todas!"),
            ResultAction::Next(next) => return run_lesson(flow, &next),
            ResultAction::Menu => return,
        }
    }
}

fn run_quiz(flow: &mut FlowController) {
    while flow.step() == FlowStep::Quiz {
        let (question, index, total, hearts) = match flow.engine() {
            Some(engine) => match engine.current_question() {
                Some(q) => (q.clone(), engine.current_index(), engine.question_count(), engine.hearts()),
                None => break,
            },
            None => break,
        };

        println!("\n[{}/{}] {} {}", index + 1, total, hearts_bar(hearts), question.stem);
        let answer = match question.kind {
            QuestionKind::Mcq => {
                for (i, choice) in question.choices.iter().enumerate() {
                    println!("  {}) {choice}", i + 1);
                }
                match read_line("Opción: ").parse::<usize>() {
                    Ok(n) if n >= 1 => Answer::Choice(n - 1),
                    _ => Answer::Choice(usize::MAX),
                }
            }
            QuestionKind::Tf => {
                Answer::Boolean(read_line("¿Verdadero o falso? (v/f): ").eq_ignore_ascii_case("v"))
            }
            QuestionKind::Fill | QuestionKind::Match => {
                if let Some(hint) = &question.hint {
                    println!("  (pista: {hint})");
                }
                Answer::Text(read_line("Respuesta: "))
            }
        };

        if let Some(outcome) = flow.answer_current(answer) {
            if outcome.correct {
                println!("✅ ¡Correcto!");
            } else {
                println!("❌ Incorrecto. {}", hearts_bar(outcome.hearts_left));
                if let Some(explanation) = &outcome.explanation {
                    println!("   {explanation}");
                }
            }
        }
        flow.advance_question();
    }
}

fn result_action(flow: &mut FlowController) -> ResultAction {
    let result = match flow.result() {
        Some(r) => r.clone(),
        None => return ResultAction::Menu,
    };
    let tier = match flow.tier() {
        Some(t) => t,
        None => return ResultAction::Menu,
    };

    println!("\n══ Resultado ({}%) ══", FlowController::step_progress(FlowStep::Result));
    if result.out_of_hearts {
        println!("💔 Te quedaste sin corazones tras {} preguntas.", result.total_questions);
    }
    println!(
        "Puntuación: {}% ({}/{} aciertos, mejor racha {})",
        result.score, result.correct_answers, result.total_questions, result.best_streak
    );
    println!("{}", tier.message);
    for tip in tier.tips {
        println!("  · {tip}");
    }
    if let Some(xp) = flow.xp_award() {
        println!("⭐ +{xp} XP");
    }
    if flow.pending_submission() {
        println!("⚠ Resultado guardado localmente; se enviará en el próximo intento.");
    }
    if let Some(notice) = flow.take_notice() {
        println!("{notice}");
    }

    let mut options = String::from("[r] reintentar el quiz  [m] volver al menú");
    if flow.can_advance_to_next_lesson() {
        options.push_str("  [s] siguiente lección");
    }
    println!("\n{options}");

    match read_line("Elige: ").to_lowercase().as_str() {
        "r" if flow.retry_quiz() => ResultAction::Retry,
        "s" if flow.avanzar_a_siguiente_leccion() => {
            let slug = flow.lesson().map(|l| l.slug.clone()).unwrap_or_default();
            ResultAction::Next(slug)
        }
        _ => ResultAction::Menu,
    }
}

fn hearts_bar(hearts: u32) -> String {
    if hearts == 0 {
        "💔".to_string()
    } else {
        "❤".repeat(hearts as usize)
    }
}

fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut buffer = String::new();
    if io::stdin().read_line(&mut buffer).is_err() {
        return String::new();
    }
    buffer.trim().to_string()
}
