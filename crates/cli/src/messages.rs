//! Operator-facing text in each supported language.

use clap::ValueEnum;

/// Language of every line the shell prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Language {
    #[default]
    #[value(name = "en")]
    English,
    #[value(name = "pt")]
    Portuguese,
}

use Language::{English, Portuguese};

impl Language {
    pub fn searching(self) -> &'static str {
        match self {
            English => "Searching for USB devices...",
            Portuguese => "Buscando dispositivos USB...",
        }
    }

    pub fn devices_found_title(self) -> &'static str {
        match self {
            English => "USB DEVICES FOUND",
            Portuguese => "DISPOSITIVOS USB ENCONTRADOS",
        }
    }

    pub fn no_devices(self) -> &'static str {
        match self {
            English => "No USB devices found.",
            Portuguese => "Nenhum dispositivo USB encontrado.",
        }
    }

    pub fn serial_number(self) -> &'static str {
        match self {
            English => "Serial Number",
            Portuguese => "Número de Série",
        }
    }

    pub fn total_found(self, count: usize) -> String {
        match self {
            English => format!("Total devices found: {count}"),
            Portuguese => format!("Total de dispositivos encontrados: {count}"),
        }
    }

    pub fn list_error(self, err: &dyn std::fmt::Display) -> String {
        match self {
            English => format!("Error while searching for USB devices: {err}"),
            Portuguese => format!("Erro ao buscar dispositivos USB: {err}"),
        }
    }

    pub fn access_hint(self) -> [&'static str; 2] {
        match self {
            English => [
                "Check if you have permissions to access USB devices.",
                "On Linux, you may need to run as root or configure udev rules.",
            ],
            Portuguese => [
                "Verifique se você tem permissões para acessar dispositivos USB.",
                "No Linux, pode ser necessário executar como root ou configurar regras udev.",
            ],
        }
    }

    pub fn list_footer(self) -> [&'static str; 2] {
        match self {
            English => [
                "Use this information to configure your mouse rebind.",
                "Run 'mouse-rebind send' to configure your mouse.",
            ],
            Portuguese => [
                "Use estas informações para configurar o rebind do seu mouse.",
                "Execute 'mouse-rebind send' para configurar seu mouse.",
            ],
        }
    }

    pub fn send_title(self) -> &'static str {
        match self {
            English => "USB MOUSE REBIND CONFIGURATION",
            Portuguese => "CONFIGURAÇÃO DE REBIND DE MOUSE USB",
        }
    }

    pub fn send_intro(self) -> [&'static str; 2] {
        match self {
            English => [
                "This tool sends commands to configure your USB mouse.",
                "If you don't know your mouse's VID/PID, run 'mouse-rebind list' first.",
            ],
            Portuguese => [
                "Esta ferramenta envia comandos para configurar seu mouse USB.",
                "Se você não conhece o VID/PID do seu mouse, execute 'mouse-rebind list' primeiro.",
            ],
        }
    }

    pub fn device_config_title(self) -> &'static str {
        match self {
            English => "DEVICE CONFIGURATION",
            Portuguese => "CONFIGURAÇÃO DO DISPOSITIVO",
        }
    }

    pub fn prompt_vid(self) -> &'static str {
        match self {
            English => "Enter mouse VID (decimal or hex)",
            Portuguese => "Digite o VID do mouse (decimal ou hex)",
        }
    }

    pub fn prompt_pid(self) -> &'static str {
        match self {
            English => "Enter mouse PID (decimal or hex)",
            Portuguese => "Digite o PID do mouse (decimal ou hex)",
        }
    }

    pub fn prompt_interface(self) -> &'static str {
        match self {
            English => "Enter interface number",
            Portuguese => "Digite o número da interface",
        }
    }

    pub fn prompt_report_type(self) -> &'static str {
        match self {
            English => "Enter Report Type",
            Portuguese => "Digite o Tipo de Relatório",
        }
    }

    pub fn invalid_number(self) -> &'static str {
        match self {
            English => "Error: Please enter a valid number (decimal or hexadecimal, 0-65535).",
            Portuguese => {
                "Erro: Por favor, insira um número válido (decimal ou hexadecimal, 0-65535)."
            }
        }
    }

    pub fn payload_help(self) -> [&'static str; 2] {
        match self {
            English => [
                "Enter payload as a sequence of bytes (hexadecimal or decimal values).",
                "For example: 0x01 0x00 0x04 or 1 0 4",
            ],
            Portuguese => [
                "Insira o payload como uma sequência de bytes (valores hexadecimais ou decimais).",
                "Por exemplo: 0x01 0x00 0x04 ou 1 0 4",
            ],
        }
    }

    pub fn payload_out_of_range(self, token: &str) -> String {
        match self {
            English => {
                format!("Warning: Value {token} outside valid range for a byte (0-255), using 0.")
            }
            Portuguese => format!(
                "Aviso: Valor {token} fora do intervalo válido para um byte (0-255), usando 0."
            ),
        }
    }

    pub fn payload_invalid(self, token: &str) -> String {
        match self {
            English => format!("Warning: Invalid value '{token}', using 0 instead."),
            Portuguese => format!("Aviso: Valor inválido '{token}', usando 0 no lugar."),
        }
    }

    pub fn payload_empty(self) -> &'static str {
        match self {
            English => "Empty payload, using default values [0x01, 0x00, 0x04]",
            Portuguese => "Payload vazio, usando valores padrão [0x01, 0x00, 0x04]",
        }
    }

    pub fn summary_title(self) -> &'static str {
        match self {
            English => "CONFIGURATION SUMMARY",
            Portuguese => "RESUMO DA CONFIGURAÇÃO",
        }
    }

    pub fn report_type_label(self) -> &'static str {
        match self {
            English => "Report Type",
            Portuguese => "Tipo de Relatório",
        }
    }

    pub fn confirm_prompt(self) -> &'static str {
        match self {
            English => "Confirm and send command? (y/n): ",
            Portuguese => "Confirmar e enviar comando? (s/n): ",
        }
    }

    /// The affirmative answer to [`Language::confirm_prompt`].
    pub fn confirm_token(self) -> &'static str {
        match self {
            English => "y",
            Portuguese => "s",
        }
    }

    pub fn cancelled(self) -> &'static str {
        match self {
            English => "Operation cancelled by user.",
            Portuguese => "Operação cancelada pelo usuário.",
        }
    }

    pub fn finding(self, vid: &str, pid: &str) -> String {
        match self {
            English => format!("Finding device with VID={vid}, PID={pid}..."),
            Portuguese => format!("Localizando dispositivo com VID={vid}, PID={pid}..."),
        }
    }

    pub fn device_found(self) -> &'static str {
        match self {
            English => "Device found!",
            Portuguese => "Dispositivo encontrado!",
        }
    }

    pub fn configuring(self) -> &'static str {
        match self {
            English => "Configuring device...",
            Portuguese => "Configurando dispositivo...",
        }
    }

    pub fn sending(self, payload: &dyn std::fmt::Display) -> String {
        match self {
            English => format!("Sending command: {payload}"),
            Portuguese => format!("Enviando comando: {payload}"),
        }
    }

    pub fn released_driver(self, interface: u8) -> String {
        match self {
            English => format!("Released kernel driver on interface {interface}."),
            Portuguese => format!("Driver do kernel liberado na interface {interface}."),
        }
    }

    pub fn detach_warning(self, detail: &dyn std::fmt::Display) -> String {
        match self {
            English => format!("Warning while releasing driver: {detail}"),
            Portuguese => format!("Aviso ao liberar driver: {detail}"),
        }
    }

    pub fn reattach_warning(self, detail: &dyn std::fmt::Display) -> String {
        match self {
            English => format!("Warning while reattaching driver: {detail}"),
            Portuguese => format!("Aviso ao reanexar driver: {detail}"),
        }
    }

    pub fn configuration_warning(self, detail: &str) -> [String; 2] {
        match self {
            English => [
                format!("Warning during configuration: {detail}"),
                "Trying to continue anyway...".to_string(),
            ],
            Portuguese => [
                format!("Aviso na configuração: {detail}"),
                "Tentando continuar mesmo assim...".to_string(),
            ],
        }
    }

    pub fn sent(self, bytes: usize) -> String {
        match self {
            English => format!("Command sent successfully! Bytes transferred: {bytes}"),
            Portuguese => format!("Comando enviado com sucesso! Bytes transferidos: {bytes}"),
        }
    }

    pub fn not_found(self, vid: &str, pid: &str) -> String {
        match self {
            English => format!("Error: Device with VID={vid}, PID={pid} not found!"),
            Portuguese => format!("Erro: Dispositivo com VID={vid}, PID={pid} não encontrado!"),
        }
    }

    pub fn usb_error(self, detail: &str) -> String {
        match self {
            English => format!("USB error while sending command: {detail}"),
            Portuguese => format!("Erro USB ao enviar comando: {detail}"),
        }
    }

    pub fn general_error(self, err: &dyn std::fmt::Display) -> String {
        match self {
            English => format!("General error while sending command: {err}"),
            Portuguese => format!("Erro geral ao enviar comando: {err}"),
        }
    }

    pub fn processed(self) -> &'static str {
        match self {
            English => "Command processed successfully!",
            Portuguese => "Comando processado com sucesso!",
        }
    }

    pub fn failed(self) -> &'static str {
        match self {
            English => "Failed to process command. Check the device and permissions.",
            Portuguese => "Falha ao processar o comando. Verifique o dispositivo e as permissões.",
        }
    }

    pub fn interrupted(self) -> &'static str {
        match self {
            English => "Operation interrupted by user.",
            Portuguese => "Operação interrompida pelo usuário.",
        }
    }

    pub fn unexpected_error(self, err: &dyn std::fmt::Display) -> String {
        match self {
            English => format!("Unexpected error: {err}"),
            Portuguese => format!("Erro inesperado: {err}"),
        }
    }

    pub fn finished(self) -> &'static str {
        match self {
            English => "Program finished.",
            Portuguese => "Programa finalizado.",
        }
    }
}
