//! Interface de terminal do roundtrip: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`RunProgress`] acompanha visualmente a
//! importação e a verificação de cada recurso.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::report::{ImportRecord, RunReport};
use crate::workflow::VerificationOutcome;

/// Indicador visual de progresso de uma execução no terminal.
///
/// Recursos aprovados aparecem em verde, falhas em vermelho com o estágio
/// e o diagnóstico, importações problemáticas em amarelo.
pub struct RunProgress {
    pb: ProgressBar,
    // Sem saída alguma (usado nos testes).
    quiet: bool,
    green: Style,
    red: Style,
    yellow: Style,
}

impl RunProgress {
    /// Inicia o spinner com a mensagem inicial.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self::with_bar(pb, false)
    }

    /// Progresso silencioso, sem spinner nem linhas impressas.
    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden(), true)
    }

    fn with_bar(pb: ProgressBar, quiet: bool) -> Self {
        Self {
            pb,
            quiet,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner.
    pub fn phase(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    // Com a barra oculta (stderr não é terminal) `println` do indicatif não imprime nada.
    fn line(&self, text: String) {
        if self.quiet {
            return;
        }
        if self.pb.is_hidden() {
            println!("{text}");
        } else {
            self.pb.println(text);
        }
    }

    pub fn import(&self, record: &ImportRecord) {
        if record.is_failure() {
            let detail = record
                .error
                .clone()
                .or_else(|| record.phase.as_ref().map(|p| format!("phase {p}")))
                .unwrap_or_default();
            self.line(format!(
                "  {} import {}: {detail}",
                self.yellow.apply_to("!"),
                record.artifact
            ));
        } else {
            self.line(format!("  {} import {}", self.green.apply_to("↑"), record.artifact));
        }
    }

    pub fn outcome(&self, outcome: &VerificationOutcome) {
        match outcome.failure() {
            None => self.line(format!("  {} {}", self.green.apply_to("✓"), outcome.uri)),
            Some(failure) => self.line(format!(
                "  {} {} {failure}",
                self.red.apply_to("✗"),
                outcome.uri
            )),
        }
    }

    /// Remove o spinner sem resumo, quando a execução aborta.
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }

    /// Finaliza o spinner e imprime o resumo da execução.
    pub fn finish(&self, report: &RunReport) {
        self.pb.finish_and_clear();
        if self.quiet {
            return;
        }
        let style = if report.is_pass() { &self.green } else { &self.red };
        println!();
        println!("{}", style.apply_to("─── Round-trip Report ───"));
        println!(
            "  checked {}  passed {}  failed {}",
            report.checked,
            report.passed,
            report.failures.len()
        );
        for (uri, failure) in &report.failures {
            println!("  {} {uri} {failure}", self.red.apply_to("✗"));
        }
    }
}
