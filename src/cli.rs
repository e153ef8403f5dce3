//! Interface de linha de comando do roundtrip baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (verify, import, list)
//! e flags globais (--config, --concurrency, --poll-timeout-ms, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::RoundtripConfig;

/// Verificador de ida e volta para recursos de um repositório remoto.
#[derive(Debug, Parser)]
#[command(name = "roundtrip", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Arquivo de configuração (padrão: roundtrip.toml no diretório atual).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Número de verificações simultâneas.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Prazo máximo de espera por cada importação, em milissegundos.
    #[arg(long, global = true)]
    pub poll_timeout_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Importa, copia, relê e compara cada recurso.
    Verify {
        /// Grava o relatório em JSON neste caminho.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Pula a importação e verifica o que já está na pasta de origem.
        #[arg(long, default_value_t = false)]
        no_import: bool,

        /// Mantém as pastas de origem e destino ao final.
        #[arg(long, default_value_t = false)]
        keep: bool,
    },

    /// Apenas importa os artefatos e mostra a fase final de cada job.
    Import,

    /// Lista os recursos candidatos à verificação.
    List,
}

impl Cli {
    /// Flags da linha de comando têm precedência sobre arquivo e ambiente.
    pub fn apply(&self, config: &mut RoundtripConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency.max(1);
        }
        if let Some(timeout) = self.poll_timeout_ms {
            config.poll_timeout_ms = Some(timeout);
        }
        if let Command::Verify { keep: true, .. } = self.command {
            config.cleanup = false;
        }
    }
}
